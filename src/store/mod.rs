//! Job Record Store
//!
//! Durable state for monitored jobs, keyed by (name, account).
//! The `JobStore` trait is the capability the ingestion endpoint,
//! poller, and summary reporter consume; `SqliteStore` is the
//! SQLite-backed implementation.

mod schema;
mod sqlite;

pub use schema::CREATE_TABLES;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::JobRecord;

/// A failed store query or mutation. Carries the backend's message;
/// for ingestion this surfaces as a server error, for the poller it
/// aborts the current tick.
#[derive(Debug, Error)]
#[error("store operation failed: {0}")]
pub struct StoreError(pub String);

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Persistence capability for job records. All operations take typed
/// arguments; implementations must never interpolate them into query
/// text.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert the record, or update every mutable field if the
    /// (name, account) pair already exists. The `alerted` flag is left
    /// untouched on update; only a fresh insert starts it at false.
    async fn upsert(&self, record: &JobRecord) -> Result<(), StoreError>;

    /// All records whose silence has exceeded their declared frequency
    /// at `now`, regardless of alert state.
    async fn overdue(&self, now: i64) -> Result<Vec<JobRecord>, StoreError>;

    /// Records that are flagged `alerted` but whose most recent
    /// heartbeat is back within the frequency window at `now`.
    async fn revived(&self, now: i64) -> Result<Vec<JobRecord>, StoreError>;

    /// Set the `alerted` flag for one (name, account) pair.
    async fn set_alerted(
        &self,
        name: &str,
        account: &str,
        alerted: bool,
    ) -> Result<(), StoreError>;
}
