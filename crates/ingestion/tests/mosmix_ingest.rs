//! MOSMIX ingest from synthetic KMZ bundles into the in-memory store.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use forecast_parser::{KmzArchive, StationFilter};
use forecast_parser::ParseError;
use ingestion::{dwd, IngestionError, PipelineOptions};
use storage::MemoryStore;
use test_utils::{hourly_steps, numbered_stations, MosmixDocument, SyntheticStation};

fn issue_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

fn archive(stations: usize) -> KmzArchive<std::io::Cursor<Vec<u8>>> {
    archive_of(numbered_stations(stations))
}

fn archive_of(stations: Vec<SyntheticStation>) -> KmzArchive<std::io::Cursor<Vec<u8>>> {
    let steps = hourly_steps(issue_time() + TimeDelta::hours(1), 240);
    let document = MosmixDocument::new(issue_time(), steps).with_stations(stations);
    KmzArchive::from_bytes(document.to_kmz()).unwrap()
}

/// Two good stations followed by one with a truncated value array.
fn corrupt_archive() -> KmzArchive<std::io::Cursor<Vec<u8>>> {
    let mut stations = numbered_stations(2);
    stations.push(SyntheticStation::new("10999", "BROKEN").with_value_count(7));
    archive_of(stations)
}

fn now() -> DateTime<Utc> {
    issue_time() + TimeDelta::minutes(70)
}

#[tokio::test]
async fn test_all_stations() {
    let store = MemoryStore::new();
    let options = PipelineOptions {
        batch_limit: 50,
        ..PipelineOptions::default()
    };

    let summary = dwd::ingest_mosmix(&store, &mut archive(3), StationFilter::All, now(), &options)
        .await
        .unwrap();

    // 39 hourly instants and 27 six-hourly samples per station
    assert_eq!(summary.records, 3 * 66);
    assert_eq!(summary.flushes, 4);

    let bucket = "mosmix:de:1704103200000";
    assert_eq!(store.set(bucket).len(), 3);
    assert_eq!(store.ttl(bucket), Some(2 * 3600));

    let hash = store.hash("mosmix:de:1704103200000:10000").unwrap();
    assert_eq!(hash["temperature"], "280.15");
    assert_eq!(hash["condition"], "dry");
    assert_eq!(hash["timestamp"], "1704103200000");
    assert!(hash["source"].starts_with("MOSMIX"));
    assert!(!hash.contains_key("present_weather"));
}

#[tokio::test]
async fn test_allow_list() {
    let store = MemoryStore::new();
    let filter = StationFilter::from_ids(["10001"]);

    let summary = dwd::ingest_mosmix(&store, &mut archive(3), filter, now(), &PipelineOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.records, 66);
    assert!(store.contains_key("mosmix:de:1704103200000:10001"));
    assert!(!store.contains_key("mosmix:de:1704103200000:10000"));
}

#[tokio::test]
async fn test_test_mode_writes_one_point() {
    let store = MemoryStore::new();
    let options = PipelineOptions {
        test_mode: true,
        ..PipelineOptions::default()
    };

    let summary = dwd::ingest_mosmix(&store, &mut archive(3), StationFilter::All, now(), &options)
        .await
        .unwrap();

    assert_eq!(summary.records, 1);
    assert_eq!(store.set("mosmix:de:1704103200000").len(), 1);
}

#[tokio::test]
async fn test_parse_error_after_partial_write() {
    let store = MemoryStore::new();
    let options = PipelineOptions {
        batch_limit: 50,
        ..PipelineOptions::default()
    };

    let result = dwd::ingest_mosmix(&store, &mut corrupt_archive(), StationFilter::All, now(), &options).await;

    assert!(matches!(
        result,
        Err(IngestionError::Parse(ParseError::CardinalityMismatch { station, .. })) if station == "10999"
    ));
    // records queued before the bad station still reach the store
    assert!(store.contains_key("mosmix:de:1704103200000:10000"));
    assert!(store.contains_key("mosmix:de:1704103200000:10001"));
    assert!(!store.contains_key("mosmix:de:1704103200000:10999"));
}

#[tokio::test]
async fn test_parse_error_wins_over_flush_error() {
    let store = MemoryStore::new();
    let options = PipelineOptions {
        batch_limit: 50,
        ..PipelineOptions::default()
    };
    // the first two batches land, the exit flush fails
    store.fail_after(2);

    let result = dwd::ingest_mosmix(&store, &mut corrupt_archive(), StationFilter::All, now(), &options).await;

    assert!(matches!(result, Err(IngestionError::Parse(_))), "got {:?}", result.err());
    assert_eq!(store.pipelines_executed(), 2);
}
