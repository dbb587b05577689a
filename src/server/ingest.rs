//! Check-in handler and validation.
//!
//! Wire fields follow the client protocol: `cronname`, `account`,
//! `email`, `frequency`, `site`. The source address comes from the
//! connection, never from the client, and the check-in timestamp is
//! taken at acceptance.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::types::JobRecord;

use super::AppState;

/// Query parameters of one check-in request. Everything is optional at
/// the wire level so that validation, not deserialization, decides the
/// response.
#[derive(Debug, Default, Deserialize)]
pub struct CheckInParams {
    #[serde(default)]
    pub cronname: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
}

/// Validate the request, then upsert the job record.
pub(super) async fn check_in(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<CheckInParams>,
) -> StatusCode {
    let now = Utc::now().timestamp();
    let source = peer.ip().to_string();

    let record = match build_record(&params, &source, now) {
        Ok(record) => record,
        Err(reason) => {
            warn!(%source, %reason, "heartbeat rejected");
            return StatusCode::NOT_FOUND;
        }
    };

    match state.store.upsert(&record).await {
        Ok(()) => {
            info!(
                name = %record.name,
                account = %record.account,
                %source,
                "heartbeat accepted"
            );
            StatusCode::CREATED
        }
        Err(err) => {
            error!(
                name = %record.name,
                account = %record.account,
                %source,
                %err,
                "failed to record heartbeat"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Parse the frequency parameter. A failed conversion maps to -1 so an
/// explicit zero stays distinguishable from an unparseable value.
fn parse_frequency(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(-1)
}

/// Validate the check-in and assemble the record to upsert. Returns
/// the failing field on rejection.
fn build_record(
    params: &CheckInParams,
    source_address: &str,
    now: i64,
) -> Result<JobRecord, String> {
    let name = params.cronname.as_deref().unwrap_or("").trim();
    let account = params.account.as_deref().unwrap_or("").trim();
    let contact = params.email.as_deref().unwrap_or("").trim();
    let frequency = parse_frequency(params.frequency.as_deref());

    if name.is_empty() {
        return Err("cronname is missing or empty".to_string());
    }
    if account.is_empty() {
        return Err("account is missing or empty".to_string());
    }
    if contact.is_empty() {
        return Err("email is missing or empty".to_string());
    }
    if frequency < 0 {
        return Err("frequency is missing or not a non-negative integer".to_string());
    }
    if source_address.is_empty() {
        return Err("source address is empty".to_string());
    }

    Ok(JobRecord {
        name: name.to_string(),
        account: account.to_string(),
        contact: contact.to_string(),
        frequency,
        last_check_in: now,
        source_address: source_address.to_string(),
        is_site: matches!(params.site.as_deref().map(str::trim), Some("1")),
        alerted: false,
    })
}
