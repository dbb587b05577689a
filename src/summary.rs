//! Summary Reporter
//!
//! On-demand digest of every currently-missed job. Read-only: it uses
//! the same overdue predicate as the poller's missed scan but mutates
//! nothing.

use anyhow::Result;
use tracing::info;

use crate::alert::AlertDispatcher;
use crate::store::{JobStore, StoreError};

/// Subject line used when the digest is delivered as an alert.
const SUMMARY_SUBJECT: &str = "vigil alert summary";

/// Render the digest: a header plus one line per missed job.
pub async fn missed_digest(store: &dyn JobStore, now: i64) -> Result<String, StoreError> {
    let mut message = String::from("vigil summary - missed jobs:\n");
    for job in store.overdue(now).await? {
        message.push_str(&format!("Name: {} | Account: {}\n", job.name, job.account));
    }
    Ok(message)
}

/// Produce the digest and deliver it: through the dispatcher when
/// `notify` is set, to stdout otherwise.
pub async fn report(
    store: &dyn JobStore,
    dispatcher: &dyn AlertDispatcher,
    now: i64,
    notify: bool,
) -> Result<()> {
    let digest = missed_digest(store, now).await?;

    if notify {
        dispatcher.send(SUMMARY_SUBJECT, &digest).await?;
        info!("summary sent through alert webhook");
    } else {
        println!("{digest}");
    }
    Ok(())
}
