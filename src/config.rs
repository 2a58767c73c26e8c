//! Run settings: `config.toml` overlaid with `CTPD_*` environment variables.
//!
//! Nested keys use a double underscore in the environment, so
//! `CTPD_CREDENTIALS__PWD` sets `credentials.pwd` and
//! `CTPD_DATABASE__INSERTER=mysql` switches backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CTPD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub prev_links: PrevLinksSettings,
    pub login: LoginSettings,
    pub session: SessionSettings,
    pub database: DatabaseSettings,
    pub cleaning: CleaningSettings,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub path: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            path: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrevLinksSettings {
    pub link_file: PathBuf,
}

impl Default for PrevLinksSettings {
    fn default() -> Self {
        PrevLinksSettings {
            link_file: PathBuf::from("scraped_links.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl Default for LoginSettings {
    fn default() -> Self {
        LoginSettings {
            url: "https://www.rep-am.com/login".to_string(),
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub base_url: String,
    pub headers: HashMap<String, String>,
    /// Pause before each blotter request.
    pub delay_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            base_url: "https://www.rep-am.com/category/local/records/police/".to_string(),
            headers: HashMap::new(),
            delay_secs: 31,
        }
    }
}

impl SessionSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// "sqlite" or "mysql".
    pub inserter: String,
    pub sqlite: SqliteSettings,
    pub mysql: MySqlSettings,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            inserter: "sqlite".to_string(),
            sqlite: SqliteSettings::default(),
            mysql: MySqlSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteSettings {
    /// Relative to `data.path`.
    pub database: PathBuf,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        SqliteSettings {
            database: PathBuf::from("police.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MySqlSettings {
    pub url: String,
}

impl Default for MySqlSettings {
    fn default() -> Self {
        MySqlSettings {
            url: "mysql://localhost/police".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleaningSettings {
    /// "basic" or "detailed".
    pub cleaner: String,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        CleaningSettings {
            cleaner: "basic".to_string(),
        }
    }
}

/// Login form fields, usually supplied through the environment.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub log: Option<String>,
    pub pwd: Option<String>,
    pub submit: Option<String>,
    pub redirect_to: Option<String>,
    pub testcookie: Option<String>,
}

impl Credentials {
    /// All five fields as form pairs, or `None` if any is missing.
    pub fn form(&self) -> Option<Vec<(&'static str, String)>> {
        Some(vec![
            ("log", self.log.clone()?),
            ("pwd", self.pwd.clone()?),
            ("submit", self.submit.clone()?),
            ("redirect_to", self.redirect_to.clone()?),
            ("testcookie", self.testcookie.clone()?),
        ])
    }
}

// Redacts `pwd` and omits the other form fields.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("log", &self.log)
            .field("pwd", &self.pwd.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn link_file(&self) -> PathBuf {
        self.data.path.join(&self.prev_links.link_file)
    }
}

// ── Tests ──
