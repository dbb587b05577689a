//! Alert Dispatcher
//!
//! Outbound notification capability. The poller and summary reporter
//! only depend on the `AlertDispatcher` trait; `WebhookDispatcher`
//! posts to a Slack-compatible incoming webhook.

mod webhook;

pub use webhook::WebhookDispatcher;

use async_trait::async_trait;
use thiserror::Error;

/// A failed alert delivery. Never fatal: the missed-alert path leaves
/// the record unalerted so the next tick retries, the revival path
/// logs and moves on.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request never completed.
    #[error("alert transport failed: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status.
    #[error("alert endpoint returned status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Transport(err.to_string())
    }
}

/// Notification capability. Callers await the result and use it to
/// decide state transitions, so implementations must report delivery
/// failures rather than swallow them.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Deliver one notification to the configured destination.
    async fn send(&self, subject: &str, body: &str) -> Result<(), DispatchError>;
}
