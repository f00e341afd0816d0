//! ==============================================================================
//! fields.rs - locale-aware scalar parsers for sheet cells
//! ==============================================================================
//!
//! purpose:
//!     turns raw cell text from the upstream sheet into numbers and utc
//!     timestamps. the sheet is filled in by hand and by scripts running with
//!     a pt-BR locale, so cells look like "28,5", "60%" or
//!     "21/03/2024 10:00 (manual)".
//!
//! rules:
//!     - nothing here fails. a cell that can't be read is `None`, never 0
//!       and never "now".
//!     - dd/mm/yyyy wall-clock times are taken as fixed UTC-3. daylight saving
//!       is deliberately not applied.
//!
//! relationships:
//!     - used by: normalize.rs (one call per cell)
//!
//! ==============================================================================

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// offset of the wall-clock times written into the sheet (UTC-3, no dst)
const SHEET_UTC_OFFSET_SECS: i32 = -3 * 3600;

static BRAZILIAN_DATETIME: OnceLock<Regex> = OnceLock::new();
static PAREN_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn brazilian_datetime() -> &'static Regex {
    BRAZILIAN_DATETIME.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
            .expect("static regex")
    })
}

fn paren_suffix() -> &'static Regex {
    PAREN_SUFFIX.get_or_init(|| Regex::new(r"\s*\(.*\)\s*$").expect("static regex"))
}

/// parse a locale-formatted number: "12,5" -> 12.5, "80%" -> 80, " 1 024 " -> 1024
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);

    let mut normalized: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if normalized.is_empty() {
        return None;
    }
    if let Some(pos) = normalized.find(',') {
        normalized.replace_range(pos..pos + 1, ".");
    }

    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// drop a trailing "(...)" annotation some sheet columns carry
pub fn strip_parenthetical_suffix(raw: &str) -> &str {
    match paren_suffix().find(raw) {
        Some(m) => raw[..m.start()].trim(),
        None => raw.trim(),
    }
}

/// `dd/mm/yyyy[ hh:mm[:ss]]` in the sheet's fixed UTC-3 zone
pub fn parse_brazilian_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let caps = brazilian_datetime().captures(raw)?;
    let num = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let date = NaiveDate::from_ymd_opt(num(3)? as i32, num(2)?, num(1)?)?;
    let time = NaiveTime::from_hms_opt(num(4)?, num(5)?, num(6)?)?;

    let sheet_zone = FixedOffset::east_opt(SHEET_UTC_OFFSET_SECS)?;
    sheet_zone
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// best-effort timestamp read; `None` for anything unrecognized
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let cleaned = strip_parenthetical_suffix(raw);

    parse_brazilian_datetime(cleaned).or_else(|| parse_generic_datetime(cleaned))
}

/// iso / rfc formats the sheet occasionally contains when a script wrote the cell.
/// offset-less values are read as utc.
fn parse_generic_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
