pub mod mysql;
pub mod sqlite;

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::batch::{ArrestDetails, Batch, Charge};
use crate::config::DatabaseSettings;
use crate::date;
use crate::error::{Error, Result};

pub use mysql::MySqlBackend;
pub use sqlite::SqliteBackend;

pub const DEFAULT_CITY: &str = "Unknown";

/// A relational destination for arrest rows.
///
/// Implementations keep their own placeholder syntax; callers only see
/// prepared rows.
#[async_trait]
pub trait Backend: Send {
    fn kind(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    async fn connect(&mut self) -> Result<()>;

    /// Release the connection. Safe to call when not connected.
    async fn close(&mut self);

    /// Create tables, and for file databases the file itself.
    async fn init_schema(&mut self) -> Result<()>;

    /// Write every arrest of `batch` inside one transaction.
    async fn write_batch(&mut self, batch: &PreparedBatch) -> Result<()>;

    async fn counts(&mut self) -> Result<RowCounts>;
}

/// Build the backend named by `database.inserter`.
pub fn get_backend(settings: &DatabaseSettings, data_path: &Path) -> Result<Box<dyn Backend>> {
    match settings.inserter.to_lowercase().as_str() {
        "sqlite" => Ok(Box::new(SqliteBackend::new(
            data_path.join(&settings.sqlite.database),
        ))),
        "mysql" => Ok(Box::new(MySqlBackend::new(settings.mysql.url.clone()))),
        _ => Err(Error::UnknownBackend(settings.inserter.clone())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub person: i64,
    pub content: i64,
}

/// Batch rows with date canonicalized and city defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatch {
    pub date: String,
    pub pd_city: String,
    pub arrests: Vec<PreparedArrest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedArrest {
    pub first_name: String,
    pub last_name: String,
    pub content: String,
    pub details: Option<PreparedDetails>,
}

/// Rows for the legacy `scrape_*` tables.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDetails {
    pub age: Option<u32>,
    pub street_address: String,
    pub city: String,
    pub charges: Vec<Charge>,
}

/// Resolve provenance and split names.
///
/// `date` falls back to the batch's own date, then to the sentinel, and is
/// always normalized. `city` falls back to the batch's city, then "Unknown".
pub fn prepare(batch: &Batch, date: Option<&str>, city: Option<&str>) -> Result<PreparedBatch> {
    let raw_date = date
        .filter(|d| !d.is_empty())
        .or(batch.date.as_deref())
        .unwrap_or(date::SENTINEL);
    let date = date::normalize(raw_date);

    let pd_city = city
        .filter(|c| !c.is_empty())
        .or(batch.pd_city.as_deref().filter(|c| !c.is_empty()))
        .unwrap_or(DEFAULT_CITY)
        .to_string();

    let mut arrests = Vec::with_capacity(batch.len());
    for (index, record) in batch.iter() {
        let (first_name, last_name) = split_name(&record.name)
            .ok_or_else(|| Error::InvalidRecord(format!("record {} has an empty name", index)))?;
        let details = record
            .details
            .as_ref()
            .map(|d| prepare_details(d, &pd_city));
        arrests.push(PreparedArrest {
            first_name,
            last_name,
            content: record.content.clone(),
            details,
        });
    }

    Ok(PreparedBatch {
        date,
        pd_city,
        arrests,
    })
}

fn prepare_details(details: &ArrestDetails, pd_city: &str) -> PreparedDetails {
    let mut address = details.address.split(", ");
    let street_address = address.next().unwrap_or_default().to_string();
    let city = address.next().unwrap_or(pd_city).to_string();
    PreparedDetails {
        age: details.age,
        street_address,
        city,
        charges: details.charges.clone(),
    }
}

/// Last whitespace token is the last name; the rest, single-spaced, the first.
pub fn split_name(name: &str) -> Option<(String, String)> {
    let mut parts: Vec<&str> = name.split_whitespace().collect();
    let last = parts.pop()?;
    Some((parts.join(" "), last.to_string()))
}

/// Writes batches through a backend, one transaction per call.
pub struct Inserter {
    backend: Box<dyn Backend>,
}

impl Inserter {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Inserter { backend }
    }

    pub fn kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_connected()
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.backend.connect().await
    }

    pub async fn close(&mut self) {
        self.backend.close().await
    }

    /// Insert into an already open connection. Returns the records written.
    pub async fn insert(
        &mut self,
        batch: &Batch,
        date: Option<&str>,
        city: Option<&str>,
    ) -> Result<usize> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let prepared = prepare(batch, date, city)?;
        self.backend.write_batch(&prepared).await?;
        info!(
            backend = self.backend.kind(),
            records = prepared.arrests.len(),
            date = %prepared.date,
            city = %prepared.pd_city,
            "inserted batch"
        );
        Ok(prepared.arrests.len())
    }

    /// Connect, insert, and close again whether or not the insert succeeded.
    pub async fn insert_scoped(
        &mut self,
        batch: &Batch,
        date: Option<&str>,
        city: Option<&str>,
    ) -> Result<usize> {
        self.connect().await?;
        let result = self.insert(batch, date, city).await;
        self.close().await;
        result
    }

    pub async fn init_schema(&mut self) -> Result<()> {
        self.backend.init_schema().await
    }

    pub async fn counts(&mut self) -> Result<RowCounts> {
        self.connect().await?;
        let result = self.backend.counts().await;
        self.close().await;
        result
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ArrestRecord;
    use crate::cleaner::Cleaner;
    use crate::config::Settings;
    use rusqlite::Connection;
    use tempfile::TempDir;

    async fn sqlite_store() -> (TempDir, std::path::PathBuf, Inserter) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("police.db");
        let mut inserter = Inserter::new(Box::new(SqliteBackend::new(path.clone())));
        inserter.init_schema().await.unwrap();
        (dir, path, inserter)
    }

    fn record(name: &str, content: &str) -> ArrestRecord {
        ArrestRecord {
            name: name.into(),
            content: content.into(),
            details: None,
        }
    }

    fn count(path: &Path, table: &str) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn name_splitting() {
        assert_eq!(
            split_name("JOHN  Q   SMITH"),
            Some(("JOHN Q".to_string(), "SMITH".to_string()))
        );
        assert_eq!(split_name("SMITH"), Some((String::new(), "SMITH".to_string())));
        assert_eq!(split_name("   "), None);
    }

    #[test]
    fn provenance_defaults() {
        let mut batch = Batch::default();
        batch.records.insert(0, record("JOHN SMITH", "larceny"));

        let p = prepare(&batch, None, None).unwrap();
        assert_eq!(p.date, date::SENTINEL);
        assert_eq!(p.pd_city, DEFAULT_CITY);

        batch.date = Some("March 27, 2020".into());
        batch.pd_city = Some("Waterbury".into());
        let p = prepare(&batch, None, Some("")).unwrap();
        assert_eq!(p.date, "2020-3-27");
        assert_eq!(p.pd_city, "Waterbury");

        let p = prepare(&batch, Some("April 2, 2020"), Some("Torrington")).unwrap();
        assert_eq!(p.date, "2020-4-2");
        assert_eq!(p.pd_city, "Torrington");
    }

    #[test]
    fn empty_name_rejected_before_writing() {
        let mut batch = Batch::default();
        batch.records.insert(4, record(" ", "larceny"));
        assert!(matches!(
            prepare(&batch, None, None),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn unknown_backend_selector() {
        let mut settings = Settings::default().database;
        settings.inserter = "postgres".into();
        assert!(matches!(
            get_backend(&settings, Path::new(".")),
            Err(Error::UnknownBackend(_))
        ));
        settings.inserter = "SQLite".into();
        assert_eq!(get_backend(&settings, Path::new(".")).unwrap().kind(), "sqlite");
        settings.inserter = "mysql".into();
        assert_eq!(get_backend(&settings, Path::new(".")).unwrap().kind(), "mysql");
    }

    #[tokio::test]
    async fn insert_requires_connection() {
        let (_dir, path, mut inserter) = sqlite_store().await;
        let mut batch = Batch::default();
        batch.records.insert(0, record("JOHN SMITH", "larceny"));
        let err = inserter.insert(&batch, None, None).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert_eq!(count(&path, "person"), 0);
    }

    #[tokio::test]
    async fn blotter_to_rows() {
        let (_dir, path, mut inserter) = sqlite_store().await;
        let batch = Cleaner::Basic.clean(&[
            "",
            "POLICE BLOTTER",
            "SMITH, JOHN, 34, 12 Main St, Hartford, CT, one count of larceny",
        ]);
        let written = inserter
            .insert_scoped(&batch, Some("March 1, 2021"), Some("Hartford"))
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert!(!inserter.is_connected());

        let conn = Connection::open(&path).unwrap();
        let (person_id, first, last): (i64, String, String) = conn
            .query_row("SELECT id, first_name, last_name FROM person", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(first, "");
        assert_eq!(last, "SMITH");

        let (ref_id, content, date, city): (i64, String, String, String) = conn
            .query_row(
                "SELECT person_id, content, date, pdcity FROM content",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(ref_id, person_id);
        assert_eq!(content, "JOHN, 34, 12 Main St, Hartford, CT, one count of larceny");
        assert_eq!(date, "2021-3-1");
        assert_eq!(city, "Hartford");
    }

    #[tokio::test]
    async fn failed_record_rolls_back_whole_batch() {
        let (_dir, path, mut inserter) = sqlite_store().await;
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER forced_failure BEFORE INSERT ON person
                 WHEN NEW.last_name = 'BOOM'
                 BEGIN SELECT RAISE(ABORT, 'forced failure'); END;",
            )
            .unwrap();

        let mut batch = Batch::default();
        batch.records.insert(0, record("JOHN SMITH", "larceny"));
        batch.records.insert(1, record("JANE BOOM", "forgery"));

        let result = inserter.insert_scoped(&batch, None, None).await;
        assert!(matches!(result, Err(Error::Sqlite(_))));
        assert!(!inserter.is_connected());
        assert_eq!(count(&path, "person"), 0);
        assert_eq!(count(&path, "content"), 0);
    }

    #[tokio::test]
    async fn detailed_records_fill_legacy_tables() {
        let (_dir, path, mut inserter) = sqlite_store().await;
        let batch = Cleaner::Detailed.clean(&[
            "JOHN SMITH, 34, of 12 Main St., Torrington, two counts of larceny, breach of peace",
            "JANE DOE, 22, 1 Elm St, larceny",
        ]);
        inserter
            .insert_scoped(&batch, Some("March 1, 2021"), Some("Waterbury"))
            .await
            .unwrap();

        assert_eq!(count(&path, "person"), 2);
        assert_eq!(count(&path, "scrape_person"), 2);
        assert_eq!(count(&path, "scrape_arrest"), 2);
        // "larceny" is shared between both arrests.
        assert_eq!(count(&path, "scrape_crime"), 2);
        assert_eq!(count(&path, "scrape_crime_count"), 3);

        let conn = Connection::open(&path).unwrap();
        let city: String = conn
            .query_row(
                "SELECT city FROM scrape_person WHERE last_name = 'DOE'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(city, "Waterbury");
        let two: i64 = conn
            .query_row(
                "SELECT cc.count FROM scrape_crime_count cc
                 JOIN scrape_person p ON p.id = cc.person_id
                 JOIN scrape_crime c ON c.id = cc.crime_id
                 WHERE p.last_name = 'SMITH' AND c.crime_name = 'larceny'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(two, 2);
    }

    #[tokio::test]
    async fn arrest_rows_use_department_city_and_posting_date() {
        let (_dir, path, mut inserter) = sqlite_store().await;
        let batch = Cleaner::Detailed.clean(&[
            "JOHN SMITH, 34, of 12 Main St., Torrington, two counts of larceny, Jan. 5. Released on bond",
        ]);
        assert_eq!(
            batch.records[&0].details.as_ref().unwrap().date.as_deref(),
            Some("Jan 5")
        );
        inserter
            .insert_scoped(&batch, Some("March 1, 2021"), Some("Waterbury"))
            .await
            .unwrap();

        let conn = Connection::open(&path).unwrap();
        let (location, date): (String, String) = conn
            .query_row("SELECT location, date FROM scrape_arrest", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(location, "Waterbury");
        assert_eq!(date, "2021-3-1");

        let home: String = conn
            .query_row("SELECT city FROM scrape_person", [], |r| r.get(0))
            .unwrap();
        assert_eq!(home, "Torrington");
    }

    #[tokio::test]
    async fn counts_rows() {
        let (_dir, _path, mut inserter) = sqlite_store().await;
        let batch = Cleaner::Basic.clean(&["JOHN SMITH, larceny", "JANE DOE, forgery"]);
        inserter.insert_scoped(&batch, None, None).await.unwrap();
        let counts = inserter.counts().await.unwrap();
        assert_eq!(counts, RowCounts { person: 2, content: 2 });
    }

    #[tokio::test]
    async fn missing_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let mut inserter = Inserter::new(Box::new(SqliteBackend::new(path)));
        let batch = Cleaner::Basic.clean(&["JOHN SMITH, larceny"]);
        let err = inserter.insert_scoped(&batch, None, None).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseNotFound(_)));
    }
}
