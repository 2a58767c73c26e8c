pub mod basic;
pub mod detailed;
pub mod vocab;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::batch::Batch;
use crate::error::{Error, Result};

/// Extraction grammar applied to a page's fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cleaner {
    /// All-caps lead, first-comma split into name and content.
    #[default]
    Basic,
    /// Legacy marker filter plus age, address and charge decomposition.
    Detailed,
}

impl Cleaner {
    /// Never fails on malformed fragments; they are skipped.
    pub fn clean<S: AsRef<str>>(&self, fragments: &[S]) -> Batch {
        match self {
            Cleaner::Basic => basic::clean(fragments),
            Cleaner::Detailed => detailed::clean(fragments),
        }
    }
}

impl FromStr for Cleaner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Cleaner::Basic),
            "detailed" => Ok(Cleaner::Detailed),
            _ => Err(Error::UnknownCleaner(s.to_string())),
        }
    }
}

impl fmt::Display for Cleaner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cleaner::Basic => f.write_str("basic"),
            Cleaner::Detailed => f.write_str("detailed"),
        }
    }
}

/// Read saved fragments: a `.json` array of strings or `.txt` with one per line.
pub fn load_fragments(path: &Path) -> Result<Vec<String>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        Some("txt") => {
            let text = std::fs::read_to_string(path)?;
            Ok(text.lines().map(str::to_string).collect())
        }
        _ => Err(Error::UnsupportedFile(path.to_path_buf())),
    }
}

// ── Tests ──
