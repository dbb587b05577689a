//! vigil - Type Definitions
//!
//! Shared types for the heartbeat monitor.

use serde::{Deserialize, Serialize};

// ─── Job Records ─────────────────────────────────────────────────

/// One monitored job, identified by the (name, account) pair.
///
/// A record is created by the first accepted heartbeat and refreshed by
/// every subsequent one. The `alerted` flag belongs to the liveness
/// poller: it flips to true when a missed-alert has been sent and back
/// to false when the job revives. Ingestion never writes it after the
/// initial insert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Name of the job.
    pub name: String,
    /// Account the job belongs to.
    pub account: String,
    /// Address to notify. Stored and refreshed, but alert routing
    /// currently goes to the shared configured channel.
    pub contact: String,
    /// How often the job is expected to check in, in seconds.
    pub frequency: i64,
    /// Unix timestamp of the most recent accepted heartbeat.
    pub last_check_in: i64,
    /// Network origin of the most recent heartbeat. Diagnostic only.
    pub source_address: String,
    /// True when the job is a long-lived service rather than a
    /// transient job. Carried for wire compatibility.
    pub is_site: bool,
    /// True iff a missed-alert has fired and no revival has been
    /// recorded since.
    pub alerted: bool,
}
