//! ==============================================================================
//! poller.rs - poll scheduler
//! ==============================================================================
//!
//! purpose:
//!     drives feed -> tokenize -> normalize -> dedup on a fixed interval and is
//!     the only writer of the snapshot store.
//!
//! states:
//!
//! ```text
//!         tick              poll finished (ok or err)
//!     idle ────> polling ──────────────────────────> idle
//!                   │
//!                   └─ tick while polling: skipped
//!
//!     `PollGate` holds that state. a slow upstream therefore delays the next
//!     poll instead of starting a second writer.
//! ```
//!
//! failure policy:
//!     any error aborts the cycle, is logged and becomes `last_error`. the
//!     published readings are only ever replaced by a complete, successful poll.
//!
//! ==============================================================================

use crate::csv::tokenize;
use crate::dedup::latest_by_sensor;
use crate::domain::SensorReading;
use crate::error::PollError;
use crate::feed::SensorFeed;
use crate::normalize::normalize_table;
use crate::store::{SnapshotReader, SnapshotStore};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// idle/polling flag; at most one permit exists at a time
#[derive(Clone, Default)]
pub struct PollGate {
    polling: Arc<AtomicBool>,
}

/// held for the duration of one poll, returns the gate to idle on drop
pub struct PollPermit {
    polling: Arc<AtomicBool>,
}

impl PollGate {
    pub fn try_begin(&self) -> Option<PollPermit> {
        self.polling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PollPermit {
                polling: self.polling.clone(),
            })
    }

    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }
}

impl Drop for PollPermit {
    fn drop(&mut self) {
        self.polling.store(false, Ordering::Release);
    }
}

/// parse a full csv export into the deduplicated reading list
pub fn process_csv(text: &str) -> Result<Vec<SensorReading>, PollError> {
    let rows = tokenize(text);
    let readings = normalize_table(&rows)?;
    Ok(latest_by_sensor(readings))
}

pub struct Poller<F> {
    feed: F,
    store: SnapshotStore,
    gate: PollGate,
    show_sensor_data: bool,
}

impl<F: SensorFeed> Poller<F> {
    pub fn new(feed: F, store: SnapshotStore) -> Self {
        Self {
            feed,
            store,
            gate: PollGate::default(),
            show_sensor_data: false,
        }
    }

    pub fn show_sensor_data(mut self, show: bool) -> Self {
        self.show_sensor_data = show;
        self
    }

    pub fn reader(&self) -> SnapshotReader {
        self.store.reader()
    }

    pub fn gate(&self) -> &PollGate {
        &self.gate
    }

    async fn fetch_and_process(&self) -> Result<Vec<SensorReading>, PollError> {
        let text = self.feed.fetch_csv().await?;
        process_csv(&text)
    }

    /// run one full cycle and publish its outcome; never fails
    pub async fn poll_once(&self) {
        match self.fetch_and_process().await {
            Ok(readings) => {
                info!("[POLL] ✓ {} sensors", readings.len());
                if self.show_sensor_data {
                    for r in &readings {
                        debug!(
                            "[SENSOR] {} | temp: {:?} | humidity: {:?} | wind: {:?} | level: {:?}",
                            crate::dedup::identity_key(r),
                            r.temp,
                            r.humidity,
                            r.wind_speed,
                            r.level
                        );
                    }
                }
                self.store.publish_success(readings, Utc::now()).await;
            }
            Err(e) => {
                if e.is_transport() {
                    warn!("[POLL] ⚠ {}", e);
                } else {
                    error!("[POLL] ✗ {}", e);
                }
                self.store.publish_failure(e.to_string()).await;
            }
        }
    }

    /// poll only if the previous cycle has finished; returns whether it ran
    pub async fn poll_if_idle(&self) -> bool {
        let Some(_permit) = self.gate.try_begin() else {
            debug!("[POLL] previous poll still running, skipping tick");
            return false;
        };
        self.poll_once().await;
        true
    }
}

/// poll immediately, then every `interval`, for the lifetime of the process
pub async fn run<F: SensorFeed>(poller: Arc<Poller<F>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("[RUNTIME] Starting sensor polling ({}ms interval)", interval.as_millis());

    loop {
        ticker.tick().await;

        // polls run as their own task so the ticker keeps its cadence and a tick
        // landing mid-poll hits the gate instead of queueing
        let poller = poller.clone();
        tokio::spawn(async move {
            poller.poll_if_idle().await;
        });
    }
}
