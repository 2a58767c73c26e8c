use async_trait::async_trait;
use sqlx::{Connection, MySql, MySqlConnection, Transaction};
use tracing::{debug, info, warn};

use super::{Backend, PreparedArrest, PreparedBatch, PreparedDetails, RowCounts};
use crate::error::{Error, Result};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS person (
        id         BIGINT AUTO_INCREMENT PRIMARY KEY,
        first_name TEXT,
        last_name  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS content (
        id        BIGINT AUTO_INCREMENT PRIMARY KEY,
        person_id BIGINT NOT NULL,
        content   TEXT,
        date      TEXT,
        pdcity    TEXT,
        FOREIGN KEY (person_id) REFERENCES person(id)
    )",
    "CREATE TABLE IF NOT EXISTS scrape_person (
        id             BIGINT AUTO_INCREMENT PRIMARY KEY,
        first_name     TEXT,
        last_name      TEXT,
        age            INT,
        street_address TEXT,
        city           TEXT
    )",
    "CREATE TABLE IF NOT EXISTS scrape_crime (
        id         BIGINT AUTO_INCREMENT PRIMARY KEY,
        crime_name VARCHAR(255) UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS scrape_arrest (
        id        BIGINT AUTO_INCREMENT PRIMARY KEY,
        location  TEXT,
        date      TEXT,
        person_id BIGINT,
        FOREIGN KEY (person_id) REFERENCES scrape_person(id)
    )",
    "CREATE TABLE IF NOT EXISTS scrape_crime_count (
        count        INT,
        crime_id     BIGINT,
        person_id    BIGINT,
        arrest_id_id BIGINT,
        FOREIGN KEY (crime_id) REFERENCES scrape_crime(id),
        FOREIGN KEY (person_id) REFERENCES scrape_person(id),
        FOREIGN KEY (arrest_id_id) REFERENCES scrape_arrest(id)
    )",
];

/// Networked MySQL server, addressed by a `mysql://` URL.
pub struct MySqlBackend {
    url: String,
    conn: Option<MySqlConnection>,
}

impl MySqlBackend {
    pub fn new(url: String) -> Self {
        MySqlBackend { url, conn: None }
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    fn kind(&self) -> &'static str {
        "mysql"
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self) -> Result<()> {
        self.conn = Some(MySqlConnection::connect(&self.url).await?);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                warn!("closing mysql connection failed: {}", e);
            }
        }
    }

    async fn init_schema(&mut self) -> Result<()> {
        let mut conn = MySqlConnection::connect(&self.url).await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut conn).await?;
        }
        conn.close().await?;
        info!("Schema ready on mysql server");
        Ok(())
    }

    async fn write_batch(&mut self, batch: &PreparedBatch) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(Error::NotConnected)?;
        let mut tx = conn.begin().await?;
        for arrest in &batch.arrests {
            let person_id = sqlx::query("INSERT INTO person (first_name, last_name) VALUES (?, ?)")
                .bind(&arrest.first_name)
                .bind(&arrest.last_name)
                .execute(&mut *tx)
                .await?
                .last_insert_id();
            debug!(person_id, first = %arrest.first_name, last = %arrest.last_name, "person");

            sqlx::query("INSERT INTO content (person_id, content, date, pdcity) VALUES (?, ?, ?, ?)")
                .bind(person_id)
                .bind(&arrest.content)
                .bind(&batch.date)
                .bind(&batch.pd_city)
                .execute(&mut *tx)
                .await?;
            debug!(person_id, content = %arrest.content, "content");

            if let Some(details) = &arrest.details {
                write_details(&mut tx, batch, arrest, details).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn counts(&mut self) -> Result<RowCounts> {
        let conn = self.conn.as_mut().ok_or(Error::NotConnected)?;
        let person: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM person")
            .fetch_one(&mut *conn)
            .await?;
        let content: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content")
            .fetch_one(&mut *conn)
            .await?;
        Ok(RowCounts { person, content })
    }
}

async fn write_details(
    tx: &mut Transaction<'_, MySql>,
    batch: &PreparedBatch,
    arrest: &PreparedArrest,
    d: &PreparedDetails,
) -> Result<()> {
    let person_id = sqlx::query(
        "INSERT INTO scrape_person (first_name, last_name, age, street_address, city)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&arrest.first_name)
    .bind(&arrest.last_name)
    .bind(d.age)
    .bind(&d.street_address)
    .bind(&d.city)
    .execute(&mut **tx)
    .await?
    .last_insert_id();

    let mut crime_ids = Vec::with_capacity(d.charges.len());
    for charge in &d.charges {
        sqlx::query("INSERT IGNORE INTO scrape_crime (crime_name) VALUES (?)")
            .bind(charge.description())
            .execute(&mut **tx)
            .await?;
        let id: i64 = sqlx::query_scalar("SELECT id FROM scrape_crime WHERE crime_name = ?")
            .bind(charge.description())
            .fetch_one(&mut **tx)
            .await?;
        crime_ids.push(id);
    }

    let arrest_id = sqlx::query("INSERT INTO scrape_arrest (location, date, person_id) VALUES (?, ?, ?)")
        .bind(&batch.pd_city)
        .bind(&batch.date)
        .bind(person_id)
        .execute(&mut **tx)
        .await?
        .last_insert_id();

    for (charge, crime_id) in d.charges.iter().zip(crime_ids) {
        sqlx::query(
            "INSERT INTO scrape_crime_count (count, crime_id, person_id, arrest_id_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(charge.count())
        .bind(crime_id)
        .bind(person_id)
        .bind(arrest_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
