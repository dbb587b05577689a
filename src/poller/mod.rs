//! Liveness Poller
//!
//! Runs the missed/revived state machine on a fixed interval. Each
//! tick scans the store twice: once for jobs whose silence has
//! exceeded their declared frequency, once for alerted jobs that have
//! started checking in again. The two predicates are disjoint, so a
//! record can never match both in the same tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::alert::AlertDispatcher;
use crate::store::{JobStore, StoreError};
use crate::types::JobRecord;

/// The liveness poller. Owns its dependencies; nothing here is
/// process-global.
pub struct Poller {
    store: Arc<dyn JobStore>,
    dispatcher: Arc<dyn AlertDispatcher>,
    interval_secs: u64,
}

impl Poller {
    /// Create a poller scanning every `interval_secs` seconds.
    pub fn new(
        store: Arc<dyn JobStore>,
        dispatcher: Arc<dyn AlertDispatcher>,
        interval_secs: u64,
    ) -> Self {
        Self {
            store,
            dispatcher,
            interval_secs,
        }
    }

    /// Sleep-then-scan loop. The next sleep starts only after the
    /// previous tick has finished, so ticks never overlap.
    pub async fn run(&self) {
        loop {
            sleep(Duration::from_secs(self.interval_secs)).await;
            debug!("checking for missed jobs");

            let now = Utc::now().timestamp();
            if let Err(err) = self.tick(now).await {
                error!(%err, "poll tick aborted, retrying next interval");
            }
        }
    }

    /// One full scan at time `now`. Missed-detection runs first by
    /// convention.
    pub async fn tick(&self, now: i64) -> Result<(), StoreError> {
        self.scan_missed(now).await?;
        self.scan_revived(now).await?;
        Ok(())
    }

    /// Alert jobs that have gone silent past their frequency. The
    /// `alerted` flag is persisted only after the alert is delivered,
    /// so a failed dispatch is retried on the next tick.
    async fn scan_missed(&self, now: i64) -> Result<(), StoreError> {
        for job in self.store.overdue(now).await? {
            if job.alerted {
                info!(
                    name = %job.name,
                    account = %job.account,
                    "alert suppressed, already alerted"
                );
                continue;
            }

            let (subject, body) = missed_message(&job);
            match self.dispatcher.send(&subject, &body).await {
                Ok(()) => {
                    self.store.set_alerted(&job.name, &job.account, true).await?;
                    info!(name = %job.name, account = %job.account, "missed-alert sent");
                }
                Err(err) => {
                    warn!(
                        name = %job.name,
                        account = %job.account,
                        %err,
                        "missed-alert dispatch failed, retrying next tick"
                    );
                }
            }
        }
        Ok(())
    }

    /// Clear the alarm for alerted jobs that are checking in again.
    /// The flag is persisted before the notification goes out; a
    /// failed dispatch never reinstates the alert.
    async fn scan_revived(&self, now: i64) -> Result<(), StoreError> {
        for job in self.store.revived(now).await? {
            self.store.set_alerted(&job.name, &job.account, false).await?;

            let (subject, body) = revived_message(&job);
            match self.dispatcher.send(&subject, &body).await {
                Ok(()) => {
                    info!(name = %job.name, account = %job.account, "revival-alert sent");
                }
                Err(err) => {
                    warn!(
                        name = %job.name,
                        account = %job.account,
                        %err,
                        "revival-alert dispatch failed"
                    );
                }
            }
        }
        Ok(())
    }
}

fn missed_message(job: &JobRecord) -> (String, String) {
    (
        format!("{}: {} failed to check in", job.name, job.account),
        format!(
            "The job {} for account {} has not checked in on time",
            job.name, job.account
        ),
    )
}

fn revived_message(job: &JobRecord) -> (String, String) {
    (
        format!("{}: {} is back online", job.name, job.account),
        format!(
            "The job {} for account {} is back online",
            job.name, job.account
        ),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::alert::DispatchError;
    use crate::store::SqliteStore;

    use super::*;

    /// Dispatcher that records deliveries and can simulate an outage.
    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(String, String)>>,
        attempts: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl AlertDispatcher for RecordingDispatcher {
        async fn send(&self, subject: &str, body: &str) -> Result<(), DispatchError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(DispatchError::Transport("simulated outage".to_string()));
            }
            self.sent
                .lock()
                .await
                .push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn record(name: &str, account: &str, frequency: i64, last_check_in: i64) -> JobRecord {
        JobRecord {
            name: name.to_string(),
            account: account.to_string(),
            contact: "ops@example.com".to_string(),
            frequency,
            last_check_in,
            source_address: "10.0.0.1".to_string(),
            is_site: false,
            alerted: false,
        }
    }

    fn fixture() -> (Arc<SqliteStore>, Arc<RecordingDispatcher>, Poller) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let poller = Poller::new(store.clone(), dispatcher.clone(), 1);
        (store, dispatcher, poller)
    }

    #[tokio::test]
    async fn test_missed_alert_fires_once_per_episode() {
        let (store, dispatcher, poller) = fixture();
        store.upsert(&record("backup", "acct-1", 60, 0)).await.unwrap();

        poller.tick(61).await.unwrap();
        assert!(store.fetch("backup", "acct-1").await.unwrap().unwrap().alerted);
        assert_eq!(dispatcher.sent.lock().await.len(), 1);

        // Further silent ticks are suppressed.
        poller.tick(120).await.unwrap();
        poller.tick(180).await.unwrap();
        poller.tick(240).await.unwrap();
        assert_eq!(dispatcher.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_job_within_frequency_is_left_alone() {
        let (store, dispatcher, poller) = fixture();
        store.upsert(&record("backup", "acct-1", 60, 0)).await.unwrap();

        poller.tick(59).await.unwrap();

        assert!(!store.fetch("backup", "acct-1").await.unwrap().unwrap().alerted);
        assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missed_dispatch_failure_retries_next_tick() {
        let (store, dispatcher, poller) = fixture();
        store.upsert(&record("backup", "acct-1", 60, 0)).await.unwrap();

        dispatcher.fail.store(true, Ordering::SeqCst);
        poller.tick(61).await.unwrap();

        // Alert not delivered, flag not persisted.
        assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 1);
        assert!(!store.fetch("backup", "acct-1").await.unwrap().unwrap().alerted);

        dispatcher.fail.store(false, Ordering::SeqCst);
        poller.tick(122).await.unwrap();

        assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.sent.lock().await.len(), 1);
        assert!(store.fetch("backup", "acct-1").await.unwrap().unwrap().alerted);
    }

    #[tokio::test]
    async fn test_revival_clears_alert_even_when_dispatch_fails() {
        let (store, dispatcher, poller) = fixture();
        store.upsert(&record("backup", "acct-1", 60, 0)).await.unwrap();
        store.set_alerted("backup", "acct-1", true).await.unwrap();

        // Fresh heartbeat arrives, then the revival notification fails.
        store.upsert(&record("backup", "acct-1", 60, 100)).await.unwrap();
        dispatcher.fail.store(true, Ordering::SeqCst);
        poller.tick(120).await.unwrap();

        assert!(!store.fetch("backup", "acct-1").await.unwrap().unwrap().alerted);
        assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_miss_and_revival_cycle() {
        let (store, dispatcher, poller) = fixture();

        // Heartbeat at T=0 creates the record unalerted.
        store
            .upsert(&record("nightly-backup", "acct-1", 3600, 0))
            .await
            .unwrap();
        assert!(!store.fetch("nightly-backup", "acct-1").await.unwrap().unwrap().alerted);

        // Silent past the frequency: missed-alert fires.
        poller.tick(3700).await.unwrap();
        let job = store.fetch("nightly-backup", "acct-1").await.unwrap().unwrap();
        assert!(job.alerted);
        {
            let sent = dispatcher.sent.lock().await;
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].0, "nightly-backup: acct-1 failed to check in");
        }

        // Heartbeat at T=3750: ingestion refreshes the timestamp but
        // leaves the alarm up.
        store
            .upsert(&record("nightly-backup", "acct-1", 3600, 3750))
            .await
            .unwrap();
        let job = store.fetch("nightly-backup", "acct-1").await.unwrap().unwrap();
        assert_eq!(job.last_check_in, 3750);
        assert!(job.alerted);

        // Next tick sees the job back inside its window: revival.
        poller.tick(3760).await.unwrap();
        let job = store.fetch("nightly-backup", "acct-1").await.unwrap().unwrap();
        assert!(!job.alerted);
        {
            let sent = dispatcher.sent.lock().await;
            assert_eq!(sent.len(), 2);
            assert_eq!(sent[1].0, "nightly-backup: acct-1 is back online");
        }
    }

    #[tokio::test]
    async fn test_scans_handle_independent_jobs_in_one_tick() {
        let (store, dispatcher, poller) = fixture();

        // One job going missed, one reviving, one healthy.
        store.upsert(&record("late", "acct-1", 60, 0)).await.unwrap();
        store.upsert(&record("recovered", "acct-1", 60, 0)).await.unwrap();
        store.set_alerted("recovered", "acct-1", true).await.unwrap();
        store.upsert(&record("recovered", "acct-1", 60, 90)).await.unwrap();
        store.upsert(&record("healthy", "acct-1", 600, 90)).await.unwrap();

        poller.tick(100).await.unwrap();

        assert!(store.fetch("late", "acct-1").await.unwrap().unwrap().alerted);
        assert!(!store.fetch("recovered", "acct-1").await.unwrap().unwrap().alerted);
        assert!(!store.fetch("healthy", "acct-1").await.unwrap().unwrap().alerted);
        assert_eq!(dispatcher.sent.lock().await.len(), 2);
    }
}
