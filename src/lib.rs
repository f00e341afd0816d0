//! sensor-ingest: polls the sensor sheet's csv export and republishes the
//! freshest reading per sensor as a json snapshot.
//!
//! pipeline (leaves first):
//!     fields -> csv -> normalize -> dedup -> feed -> poller -> store -> server

pub mod config;
pub mod csv;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod feed;
pub mod fields;
pub mod normalize;
pub mod poller;
pub mod server;
pub mod store;

pub use domain::{SensorReading, Snapshot};
pub use error::PollError;
