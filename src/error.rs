//! Poll failure taxonomy.
//!
//! Every variant aborts the current poll cycle. The `Display` text is what
//! consumers see in the snapshot's `error` field, so messages are written for
//! a dashboard operator rather than for a developer.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollError {
    /// DNS, connect, TLS or body read failure
    #[error("sensor endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("sensor endpoint timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("sensor endpoint error: {status} {body}")]
    Status { status: u16, body: String },

    /// upstream answered `OK`, i.e. it is deployed in its write mode instead of
    /// the CSV export mode
    #[error("sensor endpoint returned 'OK' instead of a CSV export (wrong deployment mode)")]
    WrongMode,

    #[error("empty CSV: no data rows")]
    EmptyCsv,

    /// configured endpoint is not a usable url; reported on every poll until
    /// the configuration is fixed
    #[error("invalid sensor endpoint url: {endpoint} ({reason})")]
    InvalidEndpoint { endpoint: String, reason: String },
}

impl PollError {
    /// transport-level failures are worth retrying on the next tick as-is;
    /// the others usually need someone to fix the sheet or the deployment
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PollError::Transport(_) | PollError::Timeout(_) | PollError::Status { .. }
        )
    }
}
