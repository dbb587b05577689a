//! Webhook alert transport.
//!
//! Posts a Slack-compatible `{channel, text}` JSON payload to the
//! configured incoming-webhook URL. All alerts share one destination;
//! the per-job contact field stays reserved.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{AlertDispatcher, DispatchError};

#[derive(Serialize)]
struct WebhookPayload<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Dispatcher that delivers alerts through an incoming webhook.
pub struct WebhookDispatcher {
    url: String,
    channel: String,
    http: Client,
}

impl WebhookDispatcher {
    /// Create a dispatcher pointed at `url`, tagging every payload
    /// with `channel`.
    pub fn new(url: String, channel: String) -> Self {
        Self {
            url,
            channel,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl AlertDispatcher for WebhookDispatcher {
    async fn send(&self, subject: &str, body: &str) -> Result<(), DispatchError> {
        debug!(subject, "posting alert to webhook");

        let payload = WebhookPayload {
            channel: &self.channel,
            text: body,
        };

        let response = self.http.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }
        Ok(())
    }
}
