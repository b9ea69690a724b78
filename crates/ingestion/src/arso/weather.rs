use std::collections::HashMap;

use chrono::{DateTime, Utc};
use forecast_parser::StationFilter;
use serde::Deserialize;
use storage::{
    BatchedWriter, BucketedRecord, KeyValueStore, TimeBucketSchema, WriteSummary, CURRENT_SI_PREFIX,
    FORECAST_SI_PREFIX,
};
use tracing::{debug, info, instrument, warn};
use weather_common::{timestamp_key, WeatherError};

use super::{optional_number, uploads_url, Number};
use crate::download::Fetch;
use crate::error::{IngestionError, Result};
use crate::options::PipelineOptions;
use crate::sanitize::sanitize_weather;

/// Snapshot ids: the nowcast, then the forecasts by day and hour.
pub const DATA_IDS: [&str; 21] = [
    "current", "d1h00", "d1h06", "d1h12", "d1h18", "d2h00", "d2h06", "d2h12", "d2h18", "d3h00",
    "d3h06", "d3h12", "d3h18", "d4h00", "d4", "d5", "d6", "d7", "d8", "d9", "d10",
];

const NOWCAST_ID: &str = "current";

/// Weather conditions of one station at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub station_id: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub icon: Option<String>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
    pub temperature: Option<f64>,
    pub temperature_low: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure_msl: Option<f64>,
}

impl WeatherRecord {
    pub fn new(station_id: impl Into<String>, source: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            station_id: station_id.into(),
            source: source.into(),
            timestamp,
            icon: None,
            wind_direction: None,
            wind_speed: None,
            temperature: None,
            temperature_low: None,
            humidity: None,
            pressure_msl: None,
        }
    }
}

impl BucketedRecord for WeatherRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn member(&self) -> String {
        self.station_id.clone()
    }

    fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("station_id".to_string(), self.station_id.clone()),
            ("source".to_string(), self.source.clone()),
            ("timestamp".to_string(), timestamp_key(self.timestamp)),
        ];
        if let Some(icon) = &self.icon {
            fields.push(("icon".to_string(), icon.clone()));
        }

        let numbers = [
            ("wind_direction", self.wind_direction),
            ("wind_speed", self.wind_speed),
            ("temperature", self.temperature),
            ("temperature_low", self.temperature_low),
            ("humidity", self.humidity),
            ("pressure_msl", self.pressure_msl),
        ];
        fields.extend(
            numbers
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name.to_string(), v.to_string()))),
        );
        fields
    }
}

/// URL of a snapshot, `None` for unknown ids.
pub fn data_url(data_id: &str) -> Option<String> {
    if data_id == NOWCAST_ID {
        Some(format!("{}/fproduct/json/sl/nowcast_si_latest.json", uploads_url()))
    } else if data_id.starts_with('d') {
        Some(format!("{}/fproduct/json/sl/forecast_si_{}.json", uploads_url(), data_id))
    } else {
        None
    }
}

/// Degrees for a Slovenian compass abbreviation (S = north, J = south,
/// V = east, Z = west).
pub fn wind_direction_degrees(text: &str) -> Option<f64> {
    let degrees = match text.trim() {
        "S" => 0.0,
        "SV" => 45.0,
        "V" => 90.0,
        "JV" => 135.0,
        "J" => 180.0,
        "JZ" => 225.0,
        "Z" => 270.0,
        "SZ" => 315.0,
        _ => return None,
    };
    Some(degrees)
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    id: String,
    #[serde(default)]
    days: Vec<Day>,
}

#[derive(Debug, Deserialize)]
struct Day {
    #[serde(default)]
    timeline: Vec<Timeline>,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    valid: String,
    clouds_icon_wwsyn_icon: Option<String>,
    #[serde(flatten)]
    values: HashMap<String, serde_json::Value>,
}

impl Timeline {
    fn number(&self, field: &str) -> Result<Option<f64>> {
        let value = match self.values.get(field) {
            Some(value) => Some(serde_json::from_value::<Number>(value.clone())?),
            None => None,
        };
        optional_number(field, value.as_ref())
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|value| value.as_str())
    }
}

/// Parse a snapshot into records of the stations `filter` accepts.
pub fn parse_snapshot(data_id: &str, json: &str, filter: &StationFilter) -> Result<Vec<WeatherRecord>> {
    let snapshot: Snapshot = serde_json::from_str(json)?;
    let mut records = Vec::new();

    for feature in snapshot.features {
        let Some(properties) = feature.properties else {
            continue;
        };

        let station_id = properties.id.trim_matches('_').to_string();
        if !filter.accepts(&station_id) {
            continue;
        }

        let Some(timeline) = properties.days.first().and_then(|day| day.timeline.first()) else {
            warn!(station = %station_id, data_id, "Feature without timeline");
            continue;
        };

        records.push(parse_timeline(data_id, station_id, timeline)?);
    }

    Ok(records)
}

fn parse_timeline(data_id: &str, station_id: String, timeline: &Timeline) -> Result<WeatherRecord> {
    let timestamp = DateTime::parse_from_str(&timeline.valid, "%Y-%m-%dT%H:%M:%S%z")
        .map_err(|_| WeatherError::InvalidTime(timeline.valid.clone()))?
        .with_timezone(&Utc);

    let source = format!("ARSO:{}:{}", data_id, station_id);
    let mut record = WeatherRecord::new(station_id, source, timestamp);
    record.icon = timeline.clouds_icon_wwsyn_icon.clone().filter(|icon| !icon.is_empty());

    // daily forecasts carry a range instead of a single temperature
    match timeline.number("txsyn")? {
        Some(high) => {
            record.temperature = Some(high);
            record.temperature_low = timeline.number("tnsyn")?;
        }
        None => record.temperature = timeline.number("t")?,
    }

    record.humidity = timeline.number("rh")?;
    record.pressure_msl = timeline.number("msl")?;
    record.wind_speed = timeline.number("ff_val")?;
    record.wind_direction = timeline.text("dd_shortText").and_then(wind_direction_degrees);

    Ok(record)
}

/// Records written per key prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeatherSummary {
    pub current: WriteSummary,
    pub forecast: WriteSummary,
    /// Snapshots not published upstream
    pub missing: usize,
}

/// Fetch every snapshot and store the records of the allowed stations.
///
/// The nowcast goes to `current:si` with the current-condition expiry,
/// forecasts to `forecast:si` with the forecast expiry.
#[instrument(skip_all, fields(stations = ?filter.station_count()))]
pub async fn ingest_weather<S, F>(
    store: &S,
    fetch: &F,
    filter: &StationFilter,
    now: DateTime<Utc>,
    options: &PipelineOptions,
) -> Result<WeatherSummary>
where
    S: KeyValueStore + ?Sized,
    F: Fetch + ?Sized,
{
    let mut summary = WeatherSummary::default();
    let (nowcast, forecasts) = DATA_IDS.split_at(1);

    let schema = TimeBucketSchema::new(CURRENT_SI_PREFIX, options.current_expiry, now);
    let mut writer = BatchedWriter::with_limit(store, schema, options.batch_limit);
    let outcome = write_snapshots(&mut writer, fetch, filter, nowcast, &mut summary.missing).await;
    let flushed = writer.finish().await;
    outcome?;
    summary.current = flushed?;

    let schema = TimeBucketSchema::new(FORECAST_SI_PREFIX, options.forecast_expiry, now);
    let mut writer = BatchedWriter::with_limit(store, schema, options.batch_limit);
    let outcome = write_snapshots(&mut writer, fetch, filter, forecasts, &mut summary.missing).await;
    let flushed = writer.finish().await;
    outcome?;
    summary.forecast = flushed?;

    info!(
        current = summary.current.records,
        forecast = summary.forecast.records,
        missing = summary.missing,
        "Processed ARSO weather data"
    );
    Ok(summary)
}

async fn write_snapshots<S, F>(
    writer: &mut BatchedWriter<'_, S, TimeBucketSchema<WeatherRecord>>,
    fetch: &F,
    filter: &StationFilter,
    data_ids: &[&str],
    missing: &mut usize,
) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    F: Fetch + ?Sized,
{
    for data_id in data_ids {
        let url = data_url(data_id)
            .ok_or_else(|| IngestionError::invalid(format!("unknown ARSO data id {}", data_id)))?;

        let json = match fetch.get_text(&url).await {
            Ok(json) => json,
            Err(e) if e.is_not_found() => {
                debug!(data_id, "Snapshot not published");
                *missing += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let records = parse_snapshot(data_id, &json, filter)?;
        debug!(data_id, records = records.len(), "Parsed snapshot");
        for record in records {
            writer.enqueue(sanitize_weather(record)).await?;
        }
    }
    Ok(())
}
