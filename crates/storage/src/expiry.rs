//! Key expiry policy for time-bucketed records.

use chrono::{DateTime, TimeDelta, Utc};
use weather_common::floor_hour;

/// Default margin for forecast records, in minutes.
pub const FORECAST_MARGIN_MINUTES: i64 = 120;
/// Default margin for current-condition records, in minutes.
pub const CURRENT_CONDITION_MARGIN_MINUTES: i64 = 60;

/// Keys expire once their instant falls more than `margin` behind the
/// current hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    margin: TimeDelta,
}

impl ExpiryPolicy {
    pub fn new(margin: TimeDelta) -> Self {
        Self { margin }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(TimeDelta::minutes(minutes))
    }

    pub fn forecast() -> Self {
        Self::from_minutes(FORECAST_MARGIN_MINUTES)
    }

    pub fn current_condition() -> Self {
        Self::from_minutes(CURRENT_CONDITION_MARGIN_MINUTES)
    }

    pub fn margin(&self) -> TimeDelta {
        self.margin
    }

    /// The instant keys are counted down to: the current hour minus the margin.
    pub fn reference_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        floor_hour(now) - self.margin
    }

    /// Seconds a record stamped `timestamp` should live. Zero or negative
    /// means the record is already stale.
    pub fn ttl_seconds(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (timestamp - self.reference_time(now)).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_forecast_ttl() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 17, 0).unwrap();
        let policy = ExpiryPolicy::forecast();

        assert_eq!(
            policy.reference_time(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
        );
        // a record at 12:00 lives four hours
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(policy.ttl_seconds(ts, now), 4 * 3600);
    }

    #[test]
    fn test_stale_record() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let policy = ExpiryPolicy::current_condition();

        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(policy.ttl_seconds(ts, now), 0);
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap();
        assert!(policy.ttl_seconds(older, now) < 0);
    }
}
