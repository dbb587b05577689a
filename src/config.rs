//! vigil Configuration
//!
//! Loads the monitor's configuration from `~/.vigil/vigil.json` (or a
//! path given on the command line). Missing fields are merged with
//! defaults; `validate` reports every problem at once since a bad
//! configuration is the one error that stops the process.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config file name within the vigil directory.
const CONFIG_FILENAME: &str = "vigil.json";

/// Runtime configuration for the ingestion endpoint, the poller, and
/// the alert webhook.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Address the heartbeat endpoint binds to.
    pub listen_addr: String,
    /// Path to the SQLite job database. A leading `~` is expanded.
    pub db_path: String,
    /// Seconds between liveness poll ticks.
    pub poll_interval_secs: u64,
    /// Incoming-webhook URL alerts are posted to.
    pub webhook_url: String,
    /// Channel name carried in the webhook payload.
    pub webhook_channel: String,
}

/// Default configuration. The webhook fields have no usable default
/// and must come from the config file.
pub fn default_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:8080".to_string(),
        db_path: "~/.vigil/vigil.db".to_string(),
        poll_interval_secs: 60,
        webhook_url: String::new(),
        webhook_channel: String::new(),
    }
}

/// Returns the full path to the vigil config file: `~/.vigil/vigil.json`.
pub fn get_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
    home.join(".vigil").join(CONFIG_FILENAME)
}

/// Load the configuration from `path`, merging defaults for unset
/// fields. A missing file yields the defaults; a malformed file is an
/// error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(default_config());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let mut config: Config = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    // Merge defaults for unset fields
    let defaults = default_config();

    if config.listen_addr.is_empty() {
        config.listen_addr = defaults.listen_addr;
    }
    if config.db_path.is_empty() {
        config.db_path = defaults.db_path;
    }
    if config.poll_interval_secs == 0 {
        config.poll_interval_secs = defaults.poll_interval_secs;
    }

    Ok(config)
}

/// Resolve a path that may start with `~` to an absolute path.
pub fn resolve_path(p: &str) -> String {
    if let Some(rest) = p.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        home.join(rest).to_string_lossy().to_string()
    } else {
        p.to_string()
    }
}

impl Config {
    /// Check the configuration, collecting every problem into a single
    /// error message.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.listen_addr.is_empty() {
            problems.push("listenAddr is empty".to_string());
        }
        if self.db_path.is_empty() {
            problems.push("dbPath is empty".to_string());
        }
        if self.poll_interval_secs < 1 {
            problems.push("pollIntervalSecs is less than 1".to_string());
        }
        if self.webhook_channel.is_empty() {
            problems.push("webhookChannel is empty".to_string());
        }
        if self.webhook_url.is_empty() {
            problems.push("webhookUrl is empty".to_string());
        } else if let Err(err) = reqwest::Url::parse(&self.webhook_url) {
            problems.push(format!("webhookUrl: {err}"));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "errors found in the configuration:\n{}",
                problems.join("\n")
            )
        }
    }
}
