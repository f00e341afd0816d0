//! ==============================================================================
//! main.rs - sensor ingest service entry point
//! ==============================================================================
//!
//! purpose:
//!     background service between the field-sensor spreadsheet and the
//!     dashboard. it polls the sheet's csv export, keeps the freshest reading
//!     per sensor and serves that snapshot over http.
//!
//! responsibilities:
//!     - load configuration (defaults < toml file < SENSOR_* environment)
//!     - install logging
//!     - run the poll loop (immediately, then every interval)
//!     - serve the snapshot api until ctrl-c
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                  sensor-ingest (this file)                  │
//!     │  ┌──────────────────┐              ┌─────────────────────┐  │
//!     │  │ poll loop        │              │ web server          │  │
//!     │  │ (10s default)    │              │ (port 5174)         │  │
//!     │  └────────┬─────────┘              └──────────┬──────────┘  │
//!     │           │ publish (swap)          read (clone arc)       │
//!     │           │        ┌──────────────────┐       │            │
//!     │           └──────> │  snapshot store  │ <─────┘            │
//!     │                    └──────────────────┘                    │
//!     └───────────┬─────────────────────────────────────────────────┘
//!                 │ https GET ?format=csv
//!                 ▼
//!          ┌─────────────┐
//!          │ sheet export│
//!          └─────────────┘
//!
//! ==============================================================================

use anyhow::{Context, Result};
use sensor_ingest::config::IngestConfig;
use sensor_ingest::feed::{export_url, HttpFeed};
use sensor_ingest::poller::{self, Poller};
use sensor_ingest::server;
use sensor_ingest::store::SnapshotStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

fn setup_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sensor_ingest={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", level);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("[ERROR] Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("[SHUTDOWN] ctrl-c received, stopping");
}

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let config = IngestConfig::from_env().context("failed to load configuration")?;

    // step 2: logging (level comes from the config)
    setup_logging(&config.logging.level);
    info!("===========================================================");
    info!("  Sensor Ingest - sheet csv -> latest reading per sensor");
    info!("===========================================================");
    config.print_summary();

    // step 3: upstream feed and the store it publishes into
    let feed = HttpFeed::new(&config.upstream.endpoint, config.fetch_timeout())?;
    match export_url(feed.endpoint()) {
        Ok(url) => info!("[STARTUP] ✓ Upstream export: {}", url),
        // keep serving; every poll will publish this error
        Err(e) => warn!("[STARTUP] ⚠ {}", e),
    }
    let poller = Arc::new(
        Poller::new(feed, SnapshotStore::new()).show_sensor_data(config.logging.show_sensor_data),
    );
    let reader = poller.reader();

    // step 4: poll loop in background
    let poll_task = tokio::spawn(poller::run(poller, config.poll_interval()));

    // step 5: serve until ctrl-c
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let served = server::run_server(reader, addr, shutdown_signal()).await;

    poll_task.abort();
    if let Err(e) = &served {
        error!("[ERROR] Web server error: {:#}", e);
    }
    served
}
