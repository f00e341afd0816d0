//! Process-wide snapshot, swapped whole on every publish.
//!
//! `SnapshotStore` is the single writer (owned by the poller). Serving code
//! gets a `SnapshotReader`, which can only hand out the current `Arc<Snapshot>`.
//! A reader therefore never sees a half-written snapshot; it either holds the
//! old value or the new one.

use crate::domain::{SensorReading, Snapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

type Shared = Arc<RwLock<Arc<Snapshot>>>;

pub struct SnapshotStore {
    current: Shared,
}

#[derive(Clone)]
pub struct SnapshotReader {
    current: Shared,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(Snapshot::default()))),
        }
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            current: self.current.clone(),
        }
    }

    /// replace readings and `updated_at` together and clear the error
    pub async fn publish_success(&self, readings: Vec<SensorReading>, at: DateTime<Utc>) {
        let next = Arc::new(Snapshot {
            readings: Arc::new(readings),
            updated_at: Some(at),
            last_error: None,
        });
        *self.current.write().await = next;
    }

    /// record a failed poll; the last good readings stay published
    pub async fn publish_failure(&self, message: String) {
        let mut guard = self.current.write().await;
        let next = Arc::new(Snapshot {
            readings: guard.readings.clone(),
            updated_at: guard.updated_at,
            last_error: Some(message),
        });
        *guard = next;
    }

    pub async fn current(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotReader {
    pub async fn current(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }
}
