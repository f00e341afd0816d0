//! ==============================================================================
//! server.rs - snapshot http api
//! ==============================================================================
//!
//! routes:
//!     GET /api/sensors/latest  -> current snapshot as json, never cached
//!     GET /healthz             -> "ok" (process liveness, not poll health)
//!     anything else            -> 404 {"error": "Not found"}
//!
//! handlers only ever read the published snapshot; they never wait on a poll.
//!
//! ==============================================================================

use crate::store::SnapshotReader;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

pub fn router(reader: SnapshotReader) -> Router {
    Router::new()
        .route("/api/sensors/latest", get(latest_handler))
        .route("/healthz", get(health_handler))
        .fallback(not_found_handler)
        .layer(CorsLayer::permissive())
        .with_state(reader)
}

/// serve until `shutdown` resolves
pub async fn run_server<S>(reader: SnapshotReader, addr: SocketAddr, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        "[STARTUP] ✓ Sensor API listening on http://{}",
        listener.local_addr().unwrap_or(addr)
    );

    axum::serve(listener, router(reader))
        .with_graceful_shutdown(shutdown)
        .await
        .context("sensor api server failed")?;
    Ok(())
}

/// json snapshot: {"sensors": [...], "updatedAt": ..., "error": ...}
async fn latest_handler(State(reader): State<SnapshotReader>) -> impl IntoResponse {
    let snapshot = reader.current().await;
    (
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Json(snapshot),
    )
}

async fn health_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "ok")
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
