//! ==============================================================================
//! normalize.rs - sheet rows to canonical sensor readings
//! ==============================================================================
//!
//! purpose:
//!     the sheet has been re-shaped several times (english/portuguese headers,
//!     ids in different columns, timestamps glued onto other columns). this
//!     module maps whatever headers are present onto one `SensorReading`.
//!
//! relationships:
//!     - input: csv.rs (tokenized rows, first row is the header row)
//!     - uses: fields.rs (number / timestamp parsing)
//!     - output: dedup.rs
//!
//! ==============================================================================

use crate::domain::SensorReading;
use crate::error::PollError;
use crate::fields::{parse_number, parse_timestamp};
use std::collections::HashMap;

pub const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "time", "datetime", "data", "date"];
pub const SENSOR_ID_ALIASES: &[&str] = &["sensorid", "sensor_id", "deviceid", "device_id", "id"];
pub const LOCATION_ALIASES: &[&str] = &["location", "local", "sensor", "name"];
pub const TEMPERATURE_ALIASES: &[&str] = &["temperature", "temp", "temperatura"];
pub const HUMIDITY_ALIASES: &[&str] = &["humidity", "umidade"];
pub const WIND_SPEED_ALIASES: &[&str] = &["windspeed", "wind_speed", "vento", "wind"];
pub const LEVEL_ALIASES: &[&str] = &["level", "nivel", "distance"];

/// level-ish columns as they are searched for a stray timestamp
const LEVEL_TIMESTAMP_ALIASES: &[&str] = &["distance", "level", "nivel"];

/// one data row keyed by normalized (trimmed, lower-cased) header
#[derive(Debug, Default)]
pub struct RawRow<'a> {
    cells: HashMap<String, &'a str>,
}

impl<'a> RawRow<'a> {
    /// pair `headers` with `cells`; short rows are padded with empty cells and
    /// extra cells are ignored. the rightmost of duplicate headers wins.
    pub fn new(headers: &[String], cells: &'a [String]) -> Self {
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                (header.trim().to_lowercase(), cell)
            })
            .collect();
        Self { cells }
    }

    /// cell of the first alias that exists as a header, even when that cell is empty
    pub fn pick(&self, aliases: &[&str]) -> Option<&'a str> {
        aliases.iter().find_map(|alias| self.cells.get(*alias).copied())
    }

    /// resolve the observation time, also looking at the temperature and level
    /// columns which older exports used to carry "value (dd/mm/yyyy hh:mm)"-style text
    fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        [TIMESTAMP_ALIASES, TEMPERATURE_ALIASES, LEVEL_TIMESTAMP_ALIASES]
            .iter()
            .filter_map(|aliases| self.pick(aliases))
            .find_map(parse_timestamp)
    }

    fn identity(&self, aliases: &[&str]) -> Option<String> {
        self.pick(aliases)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn number(&self, aliases: &[&str]) -> Option<f64> {
        self.pick(aliases).and_then(parse_number)
    }

    pub fn to_reading(&self) -> SensorReading {
        SensorReading {
            sensor_id: self.identity(SENSOR_ID_ALIASES),
            location: self.identity(LOCATION_ALIASES),
            temp: self.number(TEMPERATURE_ALIASES),
            humidity: self.number(HUMIDITY_ALIASES),
            wind_speed: self.number(WIND_SPEED_ALIASES),
            level: self.number(LEVEL_ALIASES),
            timestamp: self.timestamp(),
        }
    }
}

/// normalize a tokenized table; the first row is the header row
pub fn normalize_table(rows: &[Vec<String>]) -> Result<Vec<SensorReading>, PollError> {
    let (headers, data) = match rows.split_first() {
        Some((headers, data)) if !data.is_empty() => (headers, data),
        _ => return Err(PollError::EmptyCsv),
    };

    Ok(data
        .iter()
        .map(|cells| RawRow::new(headers, cells).to_reading())
        .collect())
}
