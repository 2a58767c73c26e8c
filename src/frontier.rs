//! Links already ingested, persisted as a JSON array of strings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

pub struct Frontier {
    path: PathBuf,
    links: Vec<String>,
    seen: HashSet<String>,
}

impl Frontier {
    /// A missing file is an empty frontier.
    pub fn load(path: &Path) -> Result<Self> {
        let links: Vec<String> = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        } else {
            debug!("No frontier at {:?}, starting empty", path);
            Vec::new()
        };
        let seen = links.iter().cloned().collect();
        Ok(Frontier {
            path: path.to_path_buf(),
            links,
            seen,
        })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    /// Candidates not yet ingested, in their original order without repeats.
    pub fn filter(&self, candidates: Vec<String>) -> Vec<String> {
        let mut fresh = HashSet::new();
        candidates
            .into_iter()
            .filter(|l| !self.contains(l) && fresh.insert(l.clone()))
            .collect()
    }

    /// Mark a link ingested. Returns false if it already was.
    pub fn record(&mut self, link: &str) -> bool {
        if !self.seen.insert(link.to_string()) {
            return false;
        }
        self.links.push(link.to_string());
        true
    }

    /// Rewrite the whole file.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(&self.links)?)?;
        info!("Saved {} links to {:?}", self.links.len(), self.path);
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn links(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn absent_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let frontier = Frontier::load(&dir.path().join("scraped_links.json")).unwrap();
        assert_eq!(frontier.len(), 0);
    }

    #[test]
    fn filter_keeps_order_and_drops_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraped_links.json");
        std::fs::write(&path, r#"["https://a/blotter-1"]"#).unwrap();
        let frontier = Frontier::load(&path).unwrap();

        let fresh = frontier.filter(links(&[
            "https://a/blotter-3",
            "https://a/blotter-1",
            "https://a/blotter-2",
            "https://a/blotter-3",
        ]));
        assert_eq!(fresh, links(&["https://a/blotter-3", "https://a/blotter-2"]));
    }

    #[test]
    fn persist_appends_after_prior_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("scraped_links.json");

        let mut frontier = Frontier::load(&path).unwrap();
        assert!(frontier.record("https://a/blotter-1"));
        assert!(!frontier.record("https://a/blotter-1"));
        frontier.persist().unwrap();

        let mut reloaded = Frontier::load(&path).unwrap();
        assert!(reloaded.contains("https://a/blotter-1"));
        reloaded.record("https://a/blotter-2");
        reloaded.persist().unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, links(&["https://a/blotter-1", "https://a/blotter-2"]));
    }
}
