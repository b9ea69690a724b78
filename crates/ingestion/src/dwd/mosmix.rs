use std::io::{BufRead, Read, Seek};

use chrono::{DateTime, Utc};
use forecast_parser::{ForecastReader, KmzArchive, StationFilter};
use storage::{BatchedWriter, KeyValueStore, TimeBucketSchema, WriteSummary, MOSMIX_PREFIX};
use tempfile::NamedTempFile;
use tracing::{info, instrument};
use weather_common::ForecastPoint;

use crate::conditions::SYNOP_PAST_WEATHER;
use crate::download::HttpClient;
use crate::error::Result;
use crate::options::PipelineOptions;
use crate::sanitize::sanitize;

/// Latest MOSMIX_S bundle with all stations.
pub const MOSMIX_URL: &str =
    "https://opendata.dwd.de/weather/local_forecasts/mos/MOSMIX_S/all_stations/kml/MOSMIX_S_LATEST_240.kmz";

/// Download the latest bundle to a temporary file, removed on drop.
pub async fn download_mosmix(http: &HttpClient) -> Result<NamedTempFile> {
    http.download(MOSMIX_URL, "DWD_MOSMIX_", ".kmz").await
}

/// Stream the forecast of every accepted station in `archive` into the
/// store under `mosmix:de`.
///
/// In test mode only the first forecast point is written.
#[instrument(skip_all, fields(stations = ?filter.station_count(), test_mode = options.test_mode))]
pub async fn ingest_mosmix<S, R>(
    store: &S,
    archive: &mut KmzArchive<R>,
    filter: StationFilter,
    now: DateTime<Utc>,
    options: &PipelineOptions,
) -> Result<WriteSummary>
where
    S: KeyValueStore + ?Sized,
    R: Read + Seek,
{
    let mut reader = ForecastReader::new(archive.cursor()?, filter, now);
    let schema = TimeBucketSchema::<ForecastPoint>::new(MOSMIX_PREFIX, options.forecast_expiry, now);
    let mut writer = BatchedWriter::with_limit(store, schema, options.batch_limit);

    let outcome = fill(&mut reader, &mut writer, options.test_mode).await;

    let flushed = writer.finish().await;
    outcome?;
    let summary = flushed?;

    let stats = reader.stats();
    info!(
        source = %reader.source(),
        stations = stats.stations,
        filtered = stats.filtered,
        records = summary.records,
        flushes = summary.flushes,
        "Processed MOSMIX forecasts"
    );
    Ok(summary)
}

async fn fill<S, B>(
    reader: &mut ForecastReader<B>,
    writer: &mut BatchedWriter<'_, S, TimeBucketSchema<ForecastPoint>>,
    test_mode: bool,
) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    B: BufRead,
{
    while let Some(points) = reader.next_station()? {
        for point in points {
            writer.enqueue(sanitize(point, &SYNOP_PAST_WEATHER)).await?;
            if test_mode {
                return Ok(());
            }
        }
    }
    Ok(())
}
