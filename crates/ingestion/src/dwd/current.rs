//! Current station observations from the DWD `-BEOB.csv` reports.
//!
//! A report is a semicolon separated table: a header of English column
//! names, a row of units led by the station id, a row of German titles and
//! then observations, newest first. Only the newest observation is used.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use storage::{BatchedWriter, KeyValueStore, TimeBucketSchema, WriteSummary, CURRENT_DE_PREFIX};
use tracing::{debug, info, instrument, warn};
use weather_common::{Element, ForecastPoint, WeatherError};

use crate::conditions::CURRENT_OBSERVATIONS;
use crate::download::Fetch;
use crate::error::{IngestionError, Result};
use crate::options::PipelineOptions;
use crate::sanitize::sanitize;
use crate::units::{celsius_to_kelvin, hpa_to_pa, km_to_m, kmh_to_ms, minutes_to_seconds};

const DATE_COLUMN: &str = "surface observations";
const TIME_COLUMN: &str = "Parameter description";
const MISSING: &str = "---";

/// Report columns, their element and the conversion to storage units.
const COLUMNS: [(&str, Element, fn(f64) -> f64); 12] = [
    ("cloud_cover_total", Element::CloudCover, identity),
    ("dew_point_temperature_at_2_meter_above_ground", Element::DewPoint, celsius_to_kelvin),
    ("dry_bulb_temperature_at_2_meter_above_ground", Element::Temperature, celsius_to_kelvin),
    ("horizontal_visibility", Element::Visibility, km_to_m),
    ("maximum_wind_speed_last_hour", Element::WindGustSpeed, kmh_to_ms),
    (
        "mean_wind_direction_during_last_10 min_at_10_meters_above_ground",
        Element::WindDirection,
        identity,
    ),
    (
        "mean_wind_speed_during last_10_min_at_10_meters_above_ground",
        Element::WindSpeed,
        kmh_to_ms,
    ),
    ("precipitation_amount_last_hour", Element::Precipitation, identity),
    ("present_weather", Element::PresentWeather, identity),
    ("pressure_reduced_to_mean_sea_level", Element::PressureMsl, hpa_to_pa),
    ("relative_humidity", Element::RelativeHumidity, identity),
    ("total_time_of_sunshine_during_last_hour", Element::Sunshine, minutes_to_seconds),
];

fn identity(value: f64) -> f64 {
    value
}

/// Report URL of a station. Four-character ids are padded with `_`.
pub fn beob_url(station_id: &str) -> String {
    let padded = if station_id.len() == 4 {
        format!("{}_", station_id)
    } else {
        station_id.to_string()
    };
    format!("https://opendata.dwd.de/weather/weather_reports/poi/{}-BEOB.csv", padded)
}

/// Parse the newest observation of a report.
pub fn parse_observations(text: &str) -> Result<ForecastPoint> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.trim().to_string(), index))
        .collect();

    let mut rows = reader.records();
    let units = rows
        .next()
        .ok_or_else(|| IngestionError::invalid("report without station row"))??;
    let station_id = units
        .get(0)
        .map(|id| id.trim().replace('_', ""))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| IngestionError::invalid("report without station id"))?;

    // German column titles
    rows.next().transpose()?;
    let row = rows
        .next()
        .ok_or_else(|| IngestionError::invalid(format!("report of {} has no observations", station_id)))??;

    let timestamp = match (cell(&columns, &row, DATE_COLUMN), cell(&columns, &row, TIME_COLUMN)) {
        (Some(date), Some(time)) => parse_observation_time(date, time)?,
        _ => return Err(IngestionError::invalid(format!("report of {} has no date", station_id))),
    };

    let source = format!("DWD:current:{}", station_id);
    let mut point = ForecastPoint::new(station_id, source, timestamp);

    for (column, element, convert) in COLUMNS {
        let value = match cell(&columns, &row, column) {
            None | Some("") | Some(MISSING) => None,
            Some(raw) => Some(convert(parse_decimal(column, raw)?)),
        };
        point.set(element, value);
    }

    Ok(point)
}

fn cell<'r>(columns: &HashMap<String, usize>, row: &'r StringRecord, name: &str) -> Option<&'r str> {
    columns.get(name).and_then(|index| row.get(*index)).map(str::trim)
}

fn parse_observation_time(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let text = format!("{} {}", date, time);
    NaiveDateTime::parse_from_str(&text, "%d.%m.%y %H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|_| WeatherError::InvalidTime(text).into())
}

/// Numbers use a decimal comma.
fn parse_decimal(field: &str, raw: &str) -> Result<f64> {
    raw.replace(',', ".").parse::<f64>().map_err(|_| {
        WeatherError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        }
        .into()
    })
}

/// Fetch and store the newest observation of every station.
///
/// Stations whose report cannot be fetched or read are skipped with a
/// warning. In test mode only the first station is processed.
#[instrument(skip_all, fields(stations = station_ids.len(), test_mode = options.test_mode))]
pub async fn ingest_current<S, F>(
    store: &S,
    fetch: &F,
    station_ids: &[String],
    now: DateTime<Utc>,
    options: &PipelineOptions,
) -> Result<WriteSummary>
where
    S: KeyValueStore + ?Sized,
    F: Fetch + ?Sized,
{
    let schema = TimeBucketSchema::<ForecastPoint>::new(CURRENT_DE_PREFIX, options.current_expiry, now);
    let mut writer = BatchedWriter::with_limit(store, schema, options.batch_limit);

    let outcome = fill(&mut writer, fetch, station_ids, options.test_mode).await;
    let flushed = writer.finish().await;
    let skipped = outcome?;
    let summary = flushed?;

    info!(records = summary.records, skipped, "Processed DWD current observations");
    Ok(summary)
}

async fn fill<S, F>(
    writer: &mut BatchedWriter<'_, S, TimeBucketSchema<ForecastPoint>>,
    fetch: &F,
    station_ids: &[String],
    test_mode: bool,
) -> Result<usize>
where
    S: KeyValueStore + ?Sized,
    F: Fetch + ?Sized,
{
    let mut skipped = 0;

    for station_id in station_ids {
        let url = beob_url(station_id);
        let point = match fetch.get_text(&url).await {
            Ok(text) => parse_observations(&text),
            Err(e) => Err(e),
        };

        match point {
            Ok(point) => {
                debug!(station = %station_id, timestamp = %point.timestamp, "Parsed observation");
                writer.enqueue(sanitize(point, &CURRENT_OBSERVATIONS)).await?;
            }
            Err(e) => {
                warn!(station = %station_id, error = %e, "Skipping station report");
                skipped += 1;
            }
        }

        if test_mode {
            break;
        }
    }

    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use storage::MemoryStore;
    use test_utils::{assert_approx_eq, beob_csv};
    use weather_common::Condition;

    use crate::download::StaticSource;

    #[test]
    fn test_beob_url() {
        assert_eq!(
            beob_url("10637"),
            "https://opendata.dwd.de/weather/weather_reports/poi/10637-BEOB.csv"
        );
        assert!(beob_url("E163").ends_with("/E163_-BEOB.csv"));
    }

    #[test]
    fn test_parse_newest_row() {
        let point = parse_observations(&beob_csv("10637")).unwrap();

        assert_eq!(point.station_id, "10637");
        assert_eq!(point.source, "DWD:current:10637");
        assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert_approx_eq!(point.get(Element::Temperature).unwrap(), 276.55, 1e-9);
        assert_approx_eq!(point.get(Element::DewPoint).unwrap(), 271.95, 1e-9);
        assert_eq!(point.get(Element::Visibility), None);
        assert_eq!(point.get(Element::WindSpeed), Some(5.0));
        assert_eq!(point.get(Element::WindGustSpeed), Some(10.0));
        assert_eq!(point.get(Element::PressureMsl), Some(101320.0));
        assert_eq!(point.get(Element::Sunshine), Some(1800.0));
        assert_eq!(point.get(Element::WindDirection), Some(370.0));
    }

    #[test]
    fn test_sanitized_observation() {
        let point = sanitize(parse_observations(&beob_csv("10637")).unwrap(), &CURRENT_OBSERVATIONS);
        assert_eq!(point.get(Element::WindDirection), Some(10.0));
        assert_eq!(point.condition, Some(Condition::Dry));
    }

    #[test]
    fn test_bad_reports() {
        assert!(parse_observations("").is_err());

        let header_only = beob_csv("10637").lines().take(3).collect::<Vec<_>>().join("\n");
        assert!(parse_observations(&header_only).is_err());

        let garbled = beob_csv("10637").replace("3,4", "warm");
        assert!(parse_observations(&garbled).is_err());
    }

    #[tokio::test]
    async fn test_ingest_skips_missing_reports() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 40, 0).unwrap();
        let source = StaticSource::new().with(beob_url("10637"), beob_csv("10637"));
        let store = MemoryStore::new();
        let ids = vec!["10400".to_string(), "10637".to_string()];

        let summary = ingest_current(&store, &source, &ids, now, &PipelineOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.records, 1);

        let key = "current:de:1705320000000:10637";
        let hash = store.hash(key).unwrap();
        assert_eq!(hash["condition"], "dry");
        assert_eq!(hash["wind_direction"], "10");
        assert_eq!(store.ttl(key), Some(3600));
    }

    #[tokio::test]
    async fn test_ingest_test_mode() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 40, 0).unwrap();
        let source = StaticSource::new()
            .with(beob_url("10637"), beob_csv("10637"))
            .with(beob_url("10400"), beob_csv("10400"));
        let store = MemoryStore::new();
        let ids = vec!["10637".to_string(), "10400".to_string()];
        let options = PipelineOptions {
            test_mode: true,
            ..PipelineOptions::default()
        };

        let summary = ingest_current(&store, &source, &ids, now, &options).await.unwrap();
        assert_eq!(summary.records, 1);
        assert!(!store.contains_key("current:de:1705320000000:10400"));
    }
}
