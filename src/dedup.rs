//! Collapse a poll's readings to the freshest one per sensor.
//!
//! Identity is `sensor_id`, then `location`, then a shared fallback key so that
//! anonymous rows compete with each other instead of all surviving.
//!
//! Recency is the observation timestamp when there is one. Without it the row
//! position stands in, which assumes the sheet is append-only and chronological.
//! Nothing in the data can confirm that; it is how the sheet is filled today.

use crate::domain::SensorReading;
use std::collections::HashMap;
use tracing::debug;

/// identity shared by readings that carry neither an id nor a location
pub const FALLBACK_KEY: &str = "default";

pub fn identity_key(reading: &SensorReading) -> &str {
    reading
        .sensor_id
        .as_deref()
        .or(reading.location.as_deref())
        .unwrap_or(FALLBACK_KEY)
}

/// epoch millis of the timestamp, or the row index when there is none
pub fn recency_score(reading: &SensorReading, index: usize) -> i64 {
    reading
        .timestamp
        .map(|ts| ts.timestamp_millis())
        .unwrap_or(index as i64)
}

/// keep one reading per identity; the highest score wins and on equal scores the
/// later row wins. output follows first appearance of each identity.
pub fn latest_by_sensor(readings: Vec<SensorReading>) -> Vec<SensorReading> {
    let total = readings.len();
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, (i64, SensorReading)> = HashMap::new();

    for (index, reading) in readings.into_iter().enumerate() {
        let score = recency_score(&reading, index);
        let key = identity_key(&reading).to_string();

        match best.get_mut(&key) {
            Some(kept) if score >= kept.0 => *kept = (score, reading),
            Some(_) => {}
            None => {
                order.push(key.clone());
                best.insert(key, (score, reading));
            }
        }
    }

    let deduplicated: Vec<SensorReading> = order
        .iter()
        .filter_map(|key| best.remove(key).map(|(_, reading)| reading))
        .collect();

    debug!(
        "Deduplicated {} readings into {} sensors",
        total,
        deduplicated.len()
    );
    deduplicated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn with_id(id: &str, hour: Option<u32>, temp: f64) -> SensorReading {
        SensorReading {
            sensor_id: Some(id.to_string()),
            temp: Some(temp),
            timestamp: hour.map(|h| Utc.with_ymd_and_hms(2024, 3, 21, h, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_keeps_latest_timestamp_per_sensor() {
        let result = latest_by_sensor(vec![with_id("A", Some(13), 1.0), with_id("A", Some(14), 2.0)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].temp, Some(2.0));
    }

    #[test]
    fn test_timestamp_beats_row_order() {
        let result = latest_by_sensor(vec![with_id("A", Some(14), 1.0), with_id("A", Some(13), 2.0)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].temp, Some(1.0));
    }

    #[test]
    fn test_equal_timestamps_later_row_wins() {
        let result = latest_by_sensor(vec![with_id("A", Some(13), 1.0), with_id("A", Some(13), 2.0)]);
        assert_eq!(result[0].temp, Some(2.0));
    }

    #[test]
    fn test_anonymous_rows_share_fallback_key() {
        let anon = |temp| SensorReading {
            temp: Some(temp),
            ..Default::default()
        };
        let result = latest_by_sensor(vec![anon(1.0), anon(2.0), anon(3.0)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].temp, Some(3.0));
        assert_eq!(identity_key(&result[0]), FALLBACK_KEY);
    }

    #[test]
    fn test_location_is_identity_without_id() {
        let at = |loc: &str, temp| SensorReading {
            location: Some(loc.to_string()),
            temp: Some(temp),
            ..Default::default()
        };
        let result = latest_by_sensor(vec![at("Ponte", 1.0), at("Centro", 2.0), at("Ponte", 3.0)]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].location.as_deref(), Some("Ponte"));
        assert_eq!(result[0].temp, Some(3.0));
        assert_eq!(result[1].location.as_deref(), Some("Centro"));
    }

    #[test]
    fn test_sensor_id_takes_precedence_over_location() {
        let reading = SensorReading {
            sensor_id: Some("S1".to_string()),
            location: Some("Ponte".to_string()),
            ..Default::default()
        };
        assert_eq!(identity_key(&reading), "S1");
    }

    #[test]
    fn test_distinct_sensors_all_survive_in_first_seen_order() {
        let result = latest_by_sensor(vec![
            with_id("B", None, 1.0),
            with_id("A", None, 2.0),
            with_id("B", None, 3.0),
        ]);
        let ids: Vec<_> = result.iter().map(|r| r.sensor_id.as_deref().unwrap()).collect();
        assert_eq!(ids, ["B", "A"]);
        assert_eq!(result[0].temp, Some(3.0));
    }

    #[test]
    fn test_empty_input() {
        assert!(latest_by_sensor(Vec::new()).is_empty());
    }
}
