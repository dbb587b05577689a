//! vigil Runtime
//!
//! The entry point for the heartbeat monitor.
//! Handles CLI args, logging, configuration, and wiring of the
//! ingestion endpoint, liveness poller, and summary reporter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vigil::alert::{AlertDispatcher, WebhookDispatcher};
use vigil::config::{get_config_path, load_config, resolve_path};
use vigil::poller::Poller;
use vigil::server;
use vigil::store::{JobStore, SqliteStore};
use vigil::summary;

/// vigil -- dead-man's-switch heartbeat monitor
#[derive(Parser, Debug)]
#[command(
    name = "vigil",
    version,
    about = "Monitor job check-ins and alert on silence"
)]
struct Cli {
    /// Start the heartbeat ingestion endpoint
    #[arg(long)]
    serve: bool,

    /// Start the liveness poller
    #[arg(long)]
    poll: bool,

    /// Print a digest of currently-missed jobs and exit
    #[arg(long)]
    summary: bool,

    /// Deliver the summary through the alert webhook instead of stdout
    #[arg(long, requires = "summary")]
    notify: bool,

    /// Config file (default is ~/.vigil/vigil.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to register Ctrl+C handler");
        info!("received shutdown signal");
    }
}

// ---- Main Run ---------------------------------------------------------------

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(get_config_path);
    let config = load_config(&config_path)?;
    config.validate()?;

    info!(config = %config_path.display(), "starting vigil");
    info!(
        listen_addr = %config.listen_addr,
        db_path = %config.db_path,
        poll_interval_secs = config.poll_interval_secs,
        webhook_channel = %config.webhook_channel,
        "effective configuration"
    );

    let store: Arc<dyn JobStore> = Arc::new(
        SqliteStore::open(&resolve_path(&config.db_path)).context("failed to open job store")?,
    );
    let dispatcher: Arc<dyn AlertDispatcher> = Arc::new(WebhookDispatcher::new(
        config.webhook_url.clone(),
        config.webhook_channel.clone(),
    ));

    if cli.summary {
        let now = chrono::Utc::now().timestamp();
        return summary::report(store.as_ref(), dispatcher.as_ref(), now, cli.notify).await;
    }

    if !cli.serve && !cli.poll {
        println!("Nothing to do. Run \"vigil --serve\", \"vigil --poll\", or \"vigil --summary\".");
        println!("Run \"vigil --help\" for usage information.");
        return Ok(());
    }

    let serve_task = async {
        if cli.serve {
            server::serve(&config.listen_addr, Arc::clone(&store)).await
        } else {
            std::future::pending::<Result<()>>().await
        }
    };

    let poll_task = async {
        if cli.poll {
            let poller = Poller::new(
                Arc::clone(&store),
                Arc::clone(&dispatcher),
                config.poll_interval_secs,
            );
            poller.run().await;
        }
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = shutdown_signal() => Ok(()),
        result = serve_task => result.context("heartbeat endpoint failed"),
        _ = poll_task => Ok(()),
    }
}

// ---- Entry Point -----------------------------------------------------------

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Fatal: {e:#}");
        std::process::exit(1);
    }
}
