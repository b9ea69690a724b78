//! Time handling utilities for forecast and observation records.

use chrono::{DateTime, DurationRound, NaiveDateTime, TimeDelta, TimeZone, Utc};

use crate::error::{WeatherError, WeatherResult};

/// Round an instant down to the start of its hour.
pub fn floor_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    // Truncation of a UTC instant to a whole hour cannot overflow.
    t.duration_trunc(TimeDelta::hours(1)).unwrap_or(t)
}

/// Store key component for a timestamp: epoch milliseconds at whole-second precision.
///
/// Consumers of the store address records by this string, e.g. `1704103200000`.
pub fn timestamp_key(t: DateTime<Utc>) -> String {
    format!("{}000", t.timestamp())
}

/// Parse a document timestamp.
///
/// Accepts RFC 3339 (with or without fractional seconds), a naive
/// `YYYY-MM-DDTHH:MM:SS` (assumed UTC) and a plain date.
pub fn parse_timestamp(s: &str) -> WeatherResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}T00:00:00", s), "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(WeatherError::InvalidTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_floor_hour() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 12, 42, 17).unwrap();
        assert_eq!(floor_hour(t), Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_timestamp_key() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(timestamp_key(t), "1704103200000");
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let dt = parse_timestamp("2024-01-15T12:00:00.000Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_naive_and_date() {
        assert_eq!(
            parse_timestamp("2024-01-15T06:00:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-01-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }
}
