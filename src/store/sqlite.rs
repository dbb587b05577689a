//! SQLite-backed job store.
//!
//! Uses rusqlite behind a tokio mutex: every operation locks, runs its
//! statements synchronously, and releases before returning. Row-level
//! consistency in SQLite is the only synchronization the monitor needs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::types::JobRecord;

use super::schema::CREATE_TABLES;

const JOB_COLUMNS: &str =
    "name, account, contact, source_address, frequency, last_check_in, is_site, alerted";

/// SQLite implementation of the job record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and initialize the
    /// schema.
    pub fn open(db_path: &str) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create db directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database: {db_path}"))?;

        // Enable WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute_batch(CREATE_TABLES)
            .context("failed to create tables")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)
            .context("failed to create tables")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fetch one record by its identity pair.
    pub async fn fetch(
        &self,
        name: &str,
        account: &str,
    ) -> Result<Option<JobRecord>, super::StoreError> {
        let conn = self.conn.lock().await;
        let record = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE name = ?1 AND account = ?2"),
                params![name, account],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }
}

#[async_trait]
impl super::JobStore for SqliteStore {
    async fn upsert(&self, record: &JobRecord) -> Result<(), super::StoreError> {
        let conn = self.conn.lock().await;
        // The conflict arm leaves `alerted` alone: only the poller's
        // revival scan clears an active alert.
        conn.execute(
            "INSERT INTO jobs (name, account, contact, source_address, frequency, last_check_in, is_site, alerted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
             ON CONFLICT (name, account) DO UPDATE SET
               contact = excluded.contact,
               source_address = excluded.source_address,
               frequency = excluded.frequency,
               last_check_in = excluded.last_check_in,
               is_site = excluded.is_site",
            params![
                record.name,
                record.account,
                record.contact,
                record.source_address,
                record.frequency,
                record.last_check_in,
                record.is_site as i32,
            ],
        )?;
        Ok(())
    }

    async fn overdue(&self, now: i64) -> Result<Vec<JobRecord>, super::StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE ?1 - last_check_in > frequency"
        ))?;
        let records = stmt
            .query_map(params![now], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn revived(&self, now: i64) -> Result<Vec<JobRecord>, super::StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE alerted = 1 AND ?1 - last_check_in <= frequency"
        ))?;
        let records = stmt
            .query_map(params![now], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn set_alerted(
        &self,
        name: &str,
        account: &str,
        alerted: bool,
    ) -> Result<(), super::StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE jobs SET alerted = ?3 WHERE name = ?1 AND account = ?2",
            params![name, account, alerted as i32],
        )?;
        Ok(())
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        name: row.get(0)?,
        account: row.get(1)?,
        contact: row.get(2)?,
        source_address: row.get(3)?,
        frequency: row.get(4)?,
        last_check_in: row.get(5)?,
        is_site: row.get::<_, i32>(6)? != 0,
        alerted: row.get::<_, i32>(7)? != 0,
    })
}
