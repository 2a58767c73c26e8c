use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Preconditions: raised immediately, never retried ──
    #[error("not connected to a database; open a connection before inserting")]
    NotConnected,

    #[error("unknown database backend {0:?} (expected \"sqlite\" or \"mysql\")")]
    UnknownBackend(String),

    #[error("unknown cleaner {0:?} (expected \"basic\" or \"detailed\")")]
    UnknownCleaner(String),

    #[error("expected a .json or .txt file, got {0:?}")]
    UnsupportedFile(PathBuf),

    #[error("database not found at {0:?}; run `init` first")]
    DatabaseNotFound(PathBuf),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // ── Environment ──
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("mysql error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    // ── Aggregate ──
    #[error("{failed} of {attempted} links failed; progress on the rest was saved")]
    RunFailed { failed: usize, attempted: usize },
}
