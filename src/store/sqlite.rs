use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info, warn};

use super::{Backend, PreparedArrest, PreparedBatch, PreparedDetails, RowCounts};
use crate::error::{Error, Result};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS person (
        id         INTEGER PRIMARY KEY,
        first_name TEXT,
        last_name  TEXT
    );

    CREATE TABLE IF NOT EXISTS content (
        id        INTEGER PRIMARY KEY,
        person_id INTEGER NOT NULL REFERENCES person(id),
        content   TEXT,
        date      TEXT,
        pdcity    TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_content_person ON content(person_id);

    -- Detailed grammar
    CREATE TABLE IF NOT EXISTS scrape_person (
        id             INTEGER PRIMARY KEY,
        first_name     TEXT,
        last_name      TEXT,
        age            INTEGER,
        street_address TEXT,
        city           TEXT
    );

    CREATE TABLE IF NOT EXISTS scrape_crime (
        id         INTEGER PRIMARY KEY,
        crime_name TEXT UNIQUE
    );

    CREATE TABLE IF NOT EXISTS scrape_arrest (
        id        INTEGER PRIMARY KEY,
        location  TEXT,
        date      TEXT,
        person_id INTEGER REFERENCES scrape_person(id)
    );

    CREATE TABLE IF NOT EXISTS scrape_crime_count (
        count        INTEGER,
        crime_id     INTEGER REFERENCES scrape_crime(id),
        person_id    INTEGER REFERENCES scrape_person(id),
        arrest_id_id INTEGER REFERENCES scrape_arrest(id)
    );
";

/// Embedded database file. The file must exist before `connect`.
pub struct SqliteBackend {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SqliteBackend {
    pub fn new(path: PathBuf) -> Self {
        SqliteBackend { path, conn: None }
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self) -> Result<()> {
        if !self.path.is_file() {
            return Err(Error::DatabaseNotFound(self.path.clone()));
        }
        self.conn = Some(self.open()?);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!("closing {:?} failed: {}", self.path, e);
            }
        }
    }

    async fn init_schema(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)?;
        info!("Schema ready at {:?}", self.path);
        Ok(())
    }

    async fn write_batch(&mut self, batch: &PreparedBatch) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(Error::NotConnected)?;
        let tx = conn.transaction()?;
        {
            let mut person = tx.prepare(
                "INSERT INTO person (first_name, last_name) VALUES (?1, ?2)",
            )?;
            let mut content = tx.prepare(
                "INSERT INTO content (person_id, content, date, pdcity)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for arrest in &batch.arrests {
                person.execute(params![arrest.first_name, arrest.last_name])?;
                let person_id = tx.last_insert_rowid();
                debug!(person_id, first = %arrest.first_name, last = %arrest.last_name, "person");

                content.execute(params![person_id, arrest.content, batch.date, batch.pd_city])?;
                debug!(person_id, content = %arrest.content, "content");

                if let Some(details) = &arrest.details {
                    write_details(&tx, batch, arrest, details)?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn counts(&mut self) -> Result<RowCounts> {
        let conn = self.conn.as_ref().ok_or(Error::NotConnected)?;
        let person = conn.query_row("SELECT COUNT(*) FROM person", [], |r| r.get(0))?;
        let content = conn.query_row("SELECT COUNT(*) FROM content", [], |r| r.get(0))?;
        Ok(RowCounts { person, content })
    }
}

/// The arrest row is located at the reporting department on the posting date.
fn write_details(
    tx: &Transaction,
    batch: &PreparedBatch,
    arrest: &PreparedArrest,
    d: &PreparedDetails,
) -> Result<()> {
    tx.execute(
        "INSERT INTO scrape_person (first_name, last_name, age, street_address, city)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![arrest.first_name, arrest.last_name, d.age, d.street_address, d.city],
    )?;
    let person_id = tx.last_insert_rowid();

    let mut crime_ids = Vec::with_capacity(d.charges.len());
    for charge in &d.charges {
        tx.execute(
            "INSERT OR IGNORE INTO scrape_crime (crime_name) VALUES (?1)",
            params![charge.description()],
        )?;
        let id: i64 = tx.query_row(
            "SELECT id FROM scrape_crime WHERE crime_name = ?1",
            params![charge.description()],
            |r| r.get(0),
        )?;
        crime_ids.push(id);
    }

    tx.execute(
        "INSERT INTO scrape_arrest (location, date, person_id) VALUES (?1, ?2, ?3)",
        params![batch.pd_city, batch.date, person_id],
    )?;
    let arrest_id = tx.last_insert_rowid();

    for (charge, crime_id) in d.charges.iter().zip(crime_ids) {
        tx.execute(
            "INSERT INTO scrape_crime_count (count, crime_id, person_id, arrest_id_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![charge.count(), crime_id, person_id, arrest_id],
        )?;
    }
    Ok(())
}
