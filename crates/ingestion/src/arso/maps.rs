use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use storage::{BatchedWriter, BucketedRecord, KeyValueStore, TimeBucketSchema, WriteSummary, MAP_SI_PREFIX};
use tracing::{debug, info, instrument};
use weather_common::timestamp_key;

use super::uploads_url;
use crate::download::Fetch;
use crate::error::{IngestionError, Result};
use crate::options::PipelineOptions;

/// How many intervals to step back looking for the newest map.
const MAX_PROBES: usize = 12;

/// INCA nowcast map products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapType {
    Precipitation,
    CloudCoverage,
    WindSpeed,
    Temperature,
    HailProbability,
}

impl MapType {
    pub const ALL: [MapType; 5] = [
        MapType::Precipitation,
        MapType::CloudCoverage,
        MapType::WindSpeed,
        MapType::Temperature,
        MapType::HailProbability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapType::Precipitation => "precipitation",
            MapType::CloudCoverage => "cloud",
            MapType::WindSpeed => "wind",
            MapType::Temperature => "temperature",
            MapType::HailProbability => "hail",
        }
    }

    /// Image URL up to the timestamp part.
    pub fn url_prefix(&self) -> String {
        let product = match self {
            MapType::Precipitation => "si0zm",
            MapType::CloudCoverage => "sp",
            MapType::WindSpeed => "wind",
            MapType::Temperature => "t2m",
            MapType::HailProbability => "hp",
        };
        format!("{}/nowcast/inca/inca_{}_", uploads_url(), product)
    }

    /// Time between two published maps.
    pub fn interval(&self) -> TimeDelta {
        match self {
            MapType::Precipitation | MapType::HailProbability => TimeDelta::minutes(5),
            MapType::CloudCoverage => TimeDelta::minutes(30),
            MapType::WindSpeed | MapType::Temperature => TimeDelta::minutes(60),
        }
    }

    /// How far back maps are kept.
    pub fn expiration(&self) -> TimeDelta {
        match self {
            MapType::Precipitation | MapType::HailProbability => TimeDelta::hours(3),
            _ => TimeDelta::hours(6),
        }
    }

    /// Forecast offsets and their URL suffix.
    pub fn forecasts(&self) -> &'static [(i64, &'static str)] {
        const HOURLY: &[(i64, &str)] = &[
            (60, "0100"),
            (120, "0200"),
            (180, "0300"),
            (240, "0400"),
            (300, "0500"),
            (360, "0600"),
        ];

        match self {
            MapType::CloudCoverage => &[(30, "0030"), (60, "0100")],
            MapType::WindSpeed | MapType::Temperature => HOURLY,
            MapType::Precipitation | MapType::HailProbability => &[],
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a map sits relative to the newest published one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationType {
    Recent,
    Historical,
    Forecast,
}

impl ObservationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationType::Recent => "recent",
            ObservationType::Historical => "historical",
            ObservationType::Forecast => "forecast",
        }
    }
}

/// One map image.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRecord {
    pub map_type: MapType,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub observation: ObservationType,
}

impl BucketedRecord for MapRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn member(&self) -> String {
        self.map_type.as_str().to_string()
    }

    fn fields(&self) -> Vec<(String, String)> {
        vec![
            ("type".to_string(), self.map_type.as_str().to_string()),
            ("expiration".to_string(), self.map_type.expiration().num_hours().to_string()),
            ("timestamp".to_string(), timestamp_key(self.timestamp)),
            ("url".to_string(), self.url.clone()),
            ("observation".to_string(), self.observation.as_str().to_string()),
        ]
    }

    fn expiry_margin(&self) -> Option<TimeDelta> {
        Some(self.map_type.expiration())
    }
}

/// Round `time` down to a multiple of `interval` since the epoch.
pub fn align_to_interval(time: DateTime<Utc>, interval: TimeDelta) -> DateTime<Utc> {
    let step = interval.num_seconds().max(1);
    let seconds = time.timestamp();
    let aligned = seconds - seconds.rem_euclid(step);
    DateTime::from_timestamp(aligned, 0).unwrap_or(time)
}

fn observed_url(map_type: MapType, time: DateTime<Utc>) -> String {
    format!("{}{}.png", map_type.url_prefix(), time.format("%Y%m%d-%H%M+0000"))
}

/// Every record of `map_type` around the newest map at `latest`: the
/// observed history back to the expiration, newest first, then forecasts.
pub fn map_records(map_type: MapType, latest: DateTime<Utc>) -> Vec<MapRecord> {
    let interval = map_type.interval();
    let steps = map_type.expiration().num_seconds() / interval.num_seconds();

    let observed = (0..=steps).map(|i| {
        let timestamp = latest - interval * i as i32;
        MapRecord {
            map_type,
            timestamp,
            url: observed_url(map_type, timestamp),
            observation: if i == 0 {
                ObservationType::Recent
            } else {
                ObservationType::Historical
            },
        }
    });

    let forecast = map_type.forecasts().iter().map(|(minutes, suffix)| MapRecord {
        map_type,
        timestamp: latest + TimeDelta::minutes(*minutes),
        url: format!(
            "{}{}+{}.png",
            map_type.url_prefix(),
            latest.format("%Y%m%d-%H%M"),
            suffix
        ),
        observation: ObservationType::Forecast,
    });

    observed.chain(forecast).collect()
}

/// Time of the newest published map at or before `now`.
pub async fn latest_map<F: Fetch + ?Sized>(
    fetch: &F,
    map_type: MapType,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let interval = map_type.interval();
    let mut candidate = align_to_interval(now, interval);

    for _ in 0..MAX_PROBES {
        if fetch.exists(&observed_url(map_type, candidate)).await? {
            return Ok(candidate);
        }
        debug!(map = %map_type, time = %candidate, "Map not published yet");
        candidate -= interval;
    }

    Err(IngestionError::invalid(format!(
        "no {} map within {} intervals of {}",
        map_type, MAX_PROBES, now
    )))
}

/// Locate the newest map of every type and store the surrounding records.
#[instrument(skip_all)]
pub async fn ingest_maps<S, F>(
    store: &S,
    fetch: &F,
    now: DateTime<Utc>,
    options: &PipelineOptions,
) -> Result<WriteSummary>
where
    S: KeyValueStore + ?Sized,
    F: Fetch + ?Sized,
{
    let schema = TimeBucketSchema::new(MAP_SI_PREFIX, options.forecast_expiry, now);
    let mut writer = BatchedWriter::with_limit(store, schema, options.batch_limit);

    let outcome = async {
        for map_type in MapType::ALL {
            let latest = latest_map(fetch, map_type, now).await?;
            let records = map_records(map_type, latest);
            info!(map = %map_type, latest = %latest, records = records.len(), "Located newest map");

            for record in records {
                writer.enqueue(record).await?;
            }
        }
        Ok::<_, IngestionError>(())
    }
    .await;

    let flushed = writer.finish().await;
    outcome?;
    let summary = flushed?;
    info!(records = summary.records, "Processed ARSO maps");
    Ok(summary)
}
