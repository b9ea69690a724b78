//! Station and forecast extraction from placemarks.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use weather_common::{Element, ForecastPoint, StationRecord};

use crate::cursor::Placemark;
use crate::elements::{MISSING_VALUE, MOSMIX_ELEMENTS};
use crate::error::{ParseError, Result};
use crate::timesteps::select;

/// Document-level timing shared by every placemark.
#[derive(Debug, Clone)]
pub struct TimeContext {
    /// Producing document, `"{product_id}:{issue_time}"`
    pub source: String,
    /// All forecast instants, in document order
    pub all: Vec<DateTime<Utc>>,
    /// Instants retained by the selection policy
    pub selected: HashSet<DateTime<Utc>>,
}

impl TimeContext {
    pub fn new(source: impl Into<String>, all: Vec<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let selected = select(&all, now).into_iter().collect();
        Self {
            source: source.into(),
            all,
            selected,
        }
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }
}

/// Station allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StationFilter {
    /// No restriction
    #[default]
    All,
    Only(HashSet<String>),
}

impl StationFilter {
    /// Build a filter from station ids. An empty list means no restriction.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: HashSet<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            StationFilter::All
        } else {
            StationFilter::Only(ids)
        }
    }

    pub fn accepts(&self, station_id: &str) -> bool {
        match self {
            StationFilter::All => true,
            StationFilter::Only(ids) => ids.contains(station_id),
        }
    }

    pub fn station_count(&self) -> Option<usize> {
        match self {
            StationFilter::All => None,
            StationFilter::Only(ids) => Some(ids.len()),
        }
    }
}

/// Station identity and position from a placemark.
pub fn extract_station(placemark: &Placemark) -> Result<StationRecord> {
    let (lon, lat, altitude) = parse_coordinates(&placemark.name, &placemark.coordinates)?;

    let mut record = StationRecord::new(placemark.name.clone()).with_position(lon, lat, altitude);
    if let Some(description) = &placemark.description {
        record = record.with_name(description.clone());
    }
    Ok(record)
}

/// Forecast points of one placemark at the selected instants.
///
/// Returns `Ok(None)` when the station is excluded by `filter`; the value
/// arrays are not touched in that case.
pub fn extract_forecast(
    placemark: &Placemark,
    context: &TimeContext,
    filter: &StationFilter,
) -> Result<Option<Vec<ForecastPoint>>> {
    if !filter.accepts(&placemark.name) {
        return Ok(None);
    }

    let station = placemark.name.as_str();
    let mut columns: Vec<(Element, Vec<Option<f64>>)> = Vec::with_capacity(MOSMIX_ELEMENTS.len());

    for (code, element) in MOSMIX_ELEMENTS {
        let raw = placemark
            .forecast(code)
            .ok_or_else(|| ParseError::MissingElement {
                station: station.to_string(),
                element: code.to_string(),
            })?;

        let values = parse_values(station, code, raw)?;
        if values.len() != context.all.len() {
            return Err(ParseError::CardinalityMismatch {
                station: station.to_string(),
                element: code.to_string(),
                expected: context.all.len(),
                found: values.len(),
            });
        }

        columns.push((element, values));
    }

    let points = context
        .all
        .iter()
        .enumerate()
        .filter(|(_, timestamp)| context.selected.contains(*timestamp))
        .map(|(index, timestamp)| {
            let mut point = ForecastPoint::new(station, context.source.as_str(), *timestamp);
            for (element, values) in &columns {
                point.set(*element, values[index]);
            }
            point
        })
        .collect();

    Ok(Some(points))
}

fn parse_values(station: &str, element: &str, raw: &str) -> Result<Vec<Option<f64>>> {
    raw.split_whitespace()
        .map(|token| {
            if token == MISSING_VALUE {
                return Ok(None);
            }
            // "NaN" and "inf" parse as f64 but are not measurements
            match token.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Some(value)),
                _ => Err(ParseError::InvalidValue {
                    station: station.to_string(),
                    element: element.to_string(),
                    value: token.to_string(),
                }),
            }
        })
        .collect()
}

fn parse_coordinates(station: &str, raw: &str) -> Result<(f64, f64, f64)> {
    let invalid = || ParseError::InvalidCoordinates {
        station: station.to_string(),
        value: raw.to_string(),
    };

    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid())?;
    if parts.iter().any(|p| !p.is_finite()) {
        return Err(invalid());
    }

    match parts.as_slice() {
        [lon, lat, altitude] => Ok((*lon, *lat, *altitude)),
        [lon, lat] => Ok((*lon, *lat, 0.0)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ForecastBlock;
    use chrono::{TimeDelta, TimeZone};

    fn placemark(name: &str, values: &str) -> Placemark {
        Placemark {
            name: name.to_string(),
            description: Some("TEST STATION".to_string()),
            coordinates: "13.5,46.05,380.0".to_string(),
            forecasts: MOSMIX_ELEMENTS
                .iter()
                .map(|(code, _)| ForecastBlock {
                    element: code.to_string(),
                    values: values.to_string(),
                })
                .collect(),
        }
    }

    fn context(count: i64) -> TimeContext {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let all = (0..count).map(|i| start + TimeDelta::hours(i)).collect();
        TimeContext::new("MOSMIX:2024-01-01T09:00:00.000Z", all, start)
    }

    #[test]
    fn test_extract_station() {
        let record = extract_station(&placemark("X1", "")).unwrap();
        assert_eq!(record.station_id, "X1");
        assert_eq!(record.station_name.as_deref(), Some("TEST STATION"));
        assert_eq!(record.lon, Some(13.5));
        assert_eq!(record.lat, Some(46.05));
        assert_eq!(record.altitude, Some(380.0));
    }

    #[test]
    fn test_invalid_coordinates() {
        let mut p = placemark("X1", "");
        p.coordinates = "east,north".to_string();
        assert!(matches!(extract_station(&p), Err(ParseError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_extract_forecast_with_missing_values() {
        let ctx = context(3);
        let points = extract_forecast(&placemark("X1", "1.5 - 2.5"), &ctx, &StationFilter::All)
            .unwrap()
            .unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].get(Element::Temperature), Some(1.5));
        assert_eq!(points[1].get(Element::Temperature), None);
        assert!(points[1].has_element(Element::Temperature));
        assert_eq!(points[2].source, "MOSMIX:2024-01-01T09:00:00.000Z");
        assert!(points.iter().all(|p| p.values.len() == MOSMIX_ELEMENTS.len()));
    }

    #[test]
    fn test_cardinality_mismatch() {
        let ctx = context(3);
        let result = extract_forecast(&placemark("X1", "1 2"), &ctx, &StationFilter::All);

        assert!(matches!(
            result,
            Err(ParseError::CardinalityMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_token() {
        let ctx = context(2);
        let result = extract_forecast(&placemark("X1", "1 n/a"), &ctx, &StationFilter::All);

        assert!(matches!(result, Err(ParseError::InvalidValue { value, .. }) if value == "n/a"));
    }

    #[test]
    fn test_non_finite_tokens() {
        let ctx = context(2);
        for token in ["NaN", "inf", "-infinity"] {
            let values = format!("1.0 {}", token);
            let result = extract_forecast(&placemark("X1", &values), &ctx, &StationFilter::All);
            assert!(
                matches!(&result, Err(ParseError::InvalidValue { value, .. }) if value == token),
                "{} accepted: {:?}",
                token,
                result
            );
        }

        let mut p = placemark("X1", "");
        p.coordinates = "NaN,46.05,380.0".to_string();
        assert!(matches!(extract_station(&p), Err(ParseError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_missing_element() {
        let ctx = context(1);
        let mut p = placemark("X1", "1");
        p.forecasts.retain(|b| b.element != "RR1c");

        assert!(matches!(
            extract_forecast(&p, &ctx, &StationFilter::All),
            Err(ParseError::MissingElement { element, .. }) if element == "RR1c"
        ));
    }

    #[test]
    fn test_filter_skips_before_parsing() {
        let ctx = context(2);
        let filter = StationFilter::from_ids(["10637"]);

        // malformed arrays are never looked at for excluded stations
        let result = extract_forecast(&placemark("X1", "garbage"), &ctx, &filter).unwrap();
        assert!(result.is_none());
        assert!(StationFilter::from_ids(Vec::<String>::new()).accepts("anything"));
    }
}
