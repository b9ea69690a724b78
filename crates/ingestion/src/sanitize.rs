//! Plausibility corrections applied before records are stored.
//!
//! Out-of-range values are discarded, never clamped. Every correction is
//! logged. Applying a sanitizer to its own output changes nothing.

use tracing::warn;
use weather_common::{Element, ForecastPoint};

use crate::arso::WeatherRecord;
use crate::conditions::ConditionTable;

const MAX_WIND_DIRECTION: f64 = 360.0;

/// Upper bounds above which a value is discarded.
const UPPER_BOUNDS: [(Element, f64); 3] = [
    (Element::CloudCover, 100.0),
    (Element::RelativeHumidity, 100.0),
    (Element::Sunshine, 3600.0),
];

/// Sanitize a forecast or observation point and derive its condition from
/// the present-weather code using `table`.
pub fn sanitize(mut point: ForecastPoint, table: &ConditionTable) -> ForecastPoint {
    if let Some(precipitation) = point.get(Element::Precipitation) {
        if precipitation < 0.0 {
            warn!(
                station = %point.station_id,
                timestamp = %point.timestamp,
                value = precipitation,
                "Ignoring negative precipitation"
            );
            point.set(Element::Precipitation, None);
        }
    }

    if let Some(direction) = point.get(Element::WindDirection) {
        let fixed = wind_direction(&point.station_id, direction);
        if fixed != Some(direction) {
            point.set(Element::WindDirection, fixed);
        }
    }

    for (element, bound) in UPPER_BOUNDS {
        if let Some(value) = point.get(element) {
            if value > bound {
                warn!(
                    station = %point.station_id,
                    element = %element,
                    value,
                    "Ignoring unphysical value"
                );
                point.set(element, None);
            }
        }
    }

    point.condition = point
        .get(Element::PresentWeather)
        .and_then(|code| table.lookup(code));

    point
}

/// Sanitize an ARSO weather snapshot.
pub fn sanitize_weather(mut record: WeatherRecord) -> WeatherRecord {
    if let Some(direction) = record.wind_direction {
        record.wind_direction = wind_direction(&record.station_id, direction);
    }

    if let Some(humidity) = record.humidity {
        if humidity > 100.0 {
            warn!(station = %record.station_id, value = humidity, "Ignoring unphysical humidity");
            record.humidity = None;
        }
    }

    record
}

/// Directions above 360° are wrapped once. A value still out of range
/// after the wrap is discarded.
fn wind_direction(station: &str, direction: f64) -> Option<f64> {
    if direction <= MAX_WIND_DIRECTION {
        return Some(direction);
    }

    let wrapped = direction - MAX_WIND_DIRECTION;
    if wrapped > MAX_WIND_DIRECTION {
        warn!(station = %station, value = direction, "Ignoring unphysical wind direction");
        None
    } else {
        warn!(station = %station, value = direction, fixed = wrapped, "Fixing out-of-bounds wind direction");
        Some(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{CURRENT_OBSERVATIONS, SYNOP_PAST_WEATHER};
    use chrono::{TimeZone, Utc};
    use weather_common::Condition;

    fn point(values: &[(Element, Option<f64>)]) -> ForecastPoint {
        let mut point = ForecastPoint::new(
            "10637",
            "MOSMIX:2024-01-01T03:00:00.000Z",
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        );
        for (element, value) in values {
            point.set(*element, *value);
        }
        point
    }

    #[test]
    fn test_wind_wrap() {
        let wrapped = sanitize(point(&[(Element::WindDirection, Some(370.0))]), &SYNOP_PAST_WEATHER);
        assert_eq!(wrapped.get(Element::WindDirection), Some(10.0));

        let full_circle = sanitize(point(&[(Element::WindDirection, Some(360.0))]), &SYNOP_PAST_WEATHER);
        assert_eq!(full_circle.get(Element::WindDirection), Some(360.0));

        let unphysical = sanitize(point(&[(Element::WindDirection, Some(750.0))]), &SYNOP_PAST_WEATHER);
        assert_eq!(unphysical.get(Element::WindDirection), None);
        assert!(unphysical.has_element(Element::WindDirection));
    }

    #[test]
    fn test_discards_out_of_range() {
        let sanitized = sanitize(
            point(&[
                (Element::Precipitation, Some(-0.1)),
                (Element::CloudCover, Some(101.0)),
                (Element::RelativeHumidity, Some(100.0)),
                (Element::Sunshine, Some(3601.0)),
                (Element::Temperature, Some(-300.0)),
            ]),
            &SYNOP_PAST_WEATHER,
        );

        assert_eq!(sanitized.get(Element::Precipitation), None);
        assert_eq!(sanitized.get(Element::CloudCover), None);
        assert_eq!(sanitized.get(Element::RelativeHumidity), Some(100.0));
        assert_eq!(sanitized.get(Element::Sunshine), None);
        assert_eq!(sanitized.get(Element::Temperature), Some(-300.0));
    }

    #[test]
    fn test_condition_per_table() {
        let raw = point(&[(Element::PresentWeather, Some(10.0))]);
        assert_eq!(sanitize(raw.clone(), &SYNOP_PAST_WEATHER).condition, Some(Condition::Dry));
        assert_eq!(sanitize(raw, &CURRENT_OBSERVATIONS).condition, Some(Condition::Sleet));

        let missing = point(&[(Element::PresentWeather, None)]);
        assert_eq!(sanitize(missing, &SYNOP_PAST_WEATHER).condition, None);
    }

    #[test]
    fn test_idempotent() {
        let cases = [
            point(&[
                (Element::WindDirection, Some(370.0)),
                (Element::Precipitation, Some(-1.0)),
                (Element::PresentWeather, Some(61.0)),
            ]),
            point(&[
                (Element::WindDirection, Some(725.0)),
                (Element::Sunshine, Some(3600.0)),
                (Element::PresentWeather, Some(5.0)),
            ]),
            point(&[(Element::CloudCover, Some(150.0)), (Element::WindDirection, None)]),
        ];

        for case in cases {
            let once = sanitize(case, &SYNOP_PAST_WEATHER);
            let twice = sanitize(once.clone(), &SYNOP_PAST_WEATHER);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_weather_record() {
        let record = WeatherRecord {
            wind_direction: Some(370.0),
            humidity: Some(104.0),
            ..WeatherRecord::new("LJUBL-ANA_BEZIGRAD", "ARSO:current:LJUBL-ANA_BEZIGRAD", Utc::now())
        };

        let once = sanitize_weather(record);
        assert_eq!(once.wind_direction, Some(10.0));
        assert_eq!(once.humidity, None);
        assert_eq!(sanitize_weather(once.clone()), once);
    }
}
