//! Forecast instant selection.
//!
//! A MOSMIX document carries 240 hourly steps. Downstream consumers only need
//! hourly resolution for the next two calendar days and a 6-hourly sample
//! for the week after that, so everything else is dropped before storage.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use weather_common::floor_hour;

/// Hours covered at hourly resolution, counted from midnight of today.
const HOURLY_WINDOW_HOURS: i64 = 48;
/// Spacing of the extended samples.
const EXTENDED_STEP_HOURS: i64 = 6;
/// Number of extended samples (seven days).
const EXTENDED_SAMPLES: i64 = 28;

/// Instants the retention policy accepts for a reference time.
///
/// The hourly window runs from the current hour up to midnight at the start
/// of the day after tomorrow; the 6-hourly samples start at that midnight.
pub fn candidate_instants(now: DateTime<Utc>) -> BTreeSet<DateTime<Utc>> {
    let hour = floor_hour(now);
    let daily = hour + TimeDelta::hours(HOURLY_WINDOW_HOURS - i64::from(hour.hour()));

    let mut candidates = BTreeSet::new();
    let mut t = hour;
    candidates.insert(t);
    while t < daily {
        t += TimeDelta::hours(1);
        candidates.insert(t);
    }
    for i in 0..EXTENDED_SAMPLES {
        candidates.insert(daily + TimeDelta::hours(EXTENDED_STEP_HOURS * i));
    }

    candidates
}

/// Members of `all` retained by the policy, in input order.
///
/// Deterministic for a fixed `now`. The result is always a subset of `all`;
/// instants the document does not cover (including the current hour when
/// `now` lies outside the document's range) are simply absent.
pub fn select(all: &[DateTime<Utc>], now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    if all.is_empty() {
        return Vec::new();
    }

    let candidates = candidate_instants(now);
    let mut seen = BTreeSet::new();

    all.iter()
        .copied()
        .filter(|t| candidates.contains(t) && seen.insert(*t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hourly(start: DateTime<Utc>, count: i64) -> Vec<DateTime<Utc>> {
        (0..count).map(|i| start + TimeDelta::hours(i)).collect()
    }

    #[test]
    fn test_candidates_from_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 20, 0).unwrap();
        let candidates = candidate_instants(now);

        // 49 hourly instants (00:00 through 00:00 two days later) plus 27
        // further 6-hourly samples
        assert_eq!(candidates.len(), 49 + 27);
        assert_eq!(candidates.first().copied(), Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(
            candidates.last().copied(),
            Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap() + TimeDelta::hours(27 * 6))
        );
    }

    #[test]
    fn test_hourly_window_is_calendar_anchored() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap();
        let all = hourly(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(), 240);
        let selected = select(&all, now);

        let midnight = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let hourly_part: Vec<_> = selected.iter().filter(|t| **t <= midnight).collect();
        assert_eq!(hourly_part.len(), 39);
        assert_eq!(*hourly_part[0], Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());

        let extended: Vec<_> = selected.iter().filter(|t| **t > midnight).collect();
        assert!(extended.iter().all(|t| t.hour() % 6 == 0));
        assert_eq!(extended.len(), 27);
    }

    #[test]
    fn test_subset_order_and_determinism() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 13, 59, 59).unwrap();
        let all = hourly(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(), 240);

        let first = select(&all, now);
        let second = select(&all, now);
        assert_eq!(first, second);

        assert!(first.iter().all(|t| all.contains(t)));
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reference_outside_range() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap();
        let all = hourly(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(), 24);
        let selected = select(&all, now);

        assert_eq!(selected.first().copied(), Some(all[0]));
        assert!(!selected.contains(&Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()));
    }

    #[test]
    fn test_irregular_resolution() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let all: Vec<_> = (0..30).map(|i| start + TimeDelta::minutes(i * 20)).collect();

        let selected = select(&all, now);
        assert!(selected.iter().all(|t| t.minute() == 0));
        assert_eq!(selected.len(), 10);
    }

    #[test]
    fn test_duplicates_and_empty() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        assert_eq!(select(&[t, t], now), vec![t]);
        assert!(select(&[], now).is_empty());
    }
}
