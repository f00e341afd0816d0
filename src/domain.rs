use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// one normalized observation taken from a row of the upstream sheet
///
/// every measurement is independently optional: `None` means the sheet did not
/// report a usable value, it is never folded into 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SensorReading {
    /// stable device/point identifier (e.g., "S1")
    #[serde(rename = "sensorId")]
    pub sensor_id: Option<String>,

    /// human-readable place name, fallback identity when there is no id
    pub location: Option<String>,

    /// temperature in celsius
    pub temp: Option<f64>,

    /// relative humidity (0-100%)
    pub humidity: Option<f64>,

    /// wind speed as reported by the sheet
    pub wind_speed: Option<f64>,

    /// water level / distance reading
    pub level: Option<f64>,

    /// observation time, normalized to utc
    #[serde(serialize_with = "iso_millis::serialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// the published state: last good readings plus the outcome of the latest poll
#[derive(Clone, Debug, Default, Serialize)]
pub struct Snapshot {
    #[serde(rename = "sensors")]
    pub readings: Arc<Vec<SensorReading>>,

    /// wall-clock time of the last successful poll
    #[serde(rename = "updatedAt", serialize_with = "iso_millis::serialize")]
    pub updated_at: Option<DateTime<Utc>>,

    /// message from the most recent poll; `None` after a success
    #[serde(rename = "error")]
    pub last_error: Option<String>,
}

/// `2024-03-21T13:00:00.000Z`, the format downstream dashboards already parse
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&format(dt)),
            None => serializer.serialize_none(),
        }
    }
}
