//! Heartbeat Ingestion Endpoint
//!
//! One GET request per check-in. Valid heartbeats are upserted into
//! the job store; the response status tells the client whether the
//! check-in was accepted (201), rejected (404), or lost to a store
//! failure (500).

mod ingest;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tracing::info;

use crate::store::JobStore;

/// Shared state for the ingestion handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
}

/// Build the ingestion router.
pub fn router(store: Arc<dyn JobStore>) -> Router {
    Router::new()
        .route("/", get(ingest::check_in))
        .with_state(AppState { store })
}

/// Bind `addr` and serve heartbeats until the task is cancelled.
pub async fn serve(addr: &str, store: Arc<dyn JobStore>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "heartbeat endpoint listening");

    axum::serve(
        listener,
        router(store).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("serving heartbeat endpoint")?;

    Ok(())
}
