//! SQLite schema for the job record store.

/// Job table. The (name, account) primary key is what makes heartbeat
/// ingestion an upsert rather than an append.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    name            TEXT NOT NULL,
    account         TEXT NOT NULL,
    contact         TEXT NOT NULL,
    source_address  TEXT NOT NULL,
    frequency       INTEGER NOT NULL,
    last_check_in   INTEGER NOT NULL,
    is_site         INTEGER NOT NULL DEFAULT 0,
    alerted         INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (name, account)
);
"#;
