//! Station index: id set, per-station hash and geo index.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use weather_common::CountryId;

use crate::error::Result;
use crate::store::{CommandPipeline, KeyValueStore};

pub fn station_set_key(country: CountryId) -> String {
    format!("station:{}", country)
}

pub fn station_key(country: CountryId, station_id: &str) -> String {
    format!("station:{}:{}", country, station_id)
}

pub fn location_key(country: CountryId) -> String {
    format!("location:{}", country)
}

/// A station as written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredStation {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub zoom_level: f64,
    /// No observations are published for the station
    pub forecast_only: bool,
    /// Source-specific extra fields
    pub metadata: Vec<(String, String)>,
}

impl StoredStation {
    fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("id".to_string(), self.id.clone()),
            ("name".to_string(), self.name.clone()),
            ("latitude".to_string(), self.latitude.to_string()),
            ("longitude".to_string(), self.longitude.to_string()),
            ("altitude".to_string(), self.altitude.to_string()),
            ("zoom_level".to_string(), self.zoom_level.to_string()),
            ("forecast_only".to_string(), u8::from(self.forecast_only).to_string()),
        ];
        fields.extend(self.metadata.iter().cloned());
        fields
    }
}

/// Add or update a station in one atomic pipeline.
pub async fn store_station<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
    station: &StoredStation,
) -> Result<()> {
    let mut pipeline = CommandPipeline::atomic();
    pipeline
        .sadd(station_set_key(country), station.id.as_str())
        .geoadd(location_key(country), station.longitude, station.latitude, station.id.as_str())
        .hset(station_key(country, &station.id), station.fields());

    store.execute(&pipeline).await?;
    debug!(country = %country, station = %station.id, "Stored station");
    Ok(())
}

/// All stored stations of a country keyed by id.
pub async fn load_stations<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
) -> Result<BTreeMap<String, HashMap<String, String>>> {
    let mut ids: Vec<String> = store.members(&station_set_key(country)).await?.into_iter().collect();
    ids.sort();

    let keys: Vec<String> = ids.iter().map(|id| station_key(country, id)).collect();
    let hashes = store.hashes(&keys).await?;

    let stations: BTreeMap<_, _> = ids
        .into_iter()
        .zip(hashes)
        .filter(|(_, hash)| !hash.is_empty())
        .collect();

    debug!(country = %country, count = stations.len(), "Loaded stations");
    Ok(stations)
}

/// Remove stored stations that are not in `truth`.
///
/// Each obsolete id is removed in its own atomic pipeline (set membership,
/// hash and geo entry together). Ids are never added. Returns the number
/// of removed stations.
#[instrument(skip_all, fields(country = %country, truth = truth.len()))]
pub async fn reconcile_stations<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
    truth: &HashSet<String>,
) -> Result<usize> {
    let existing = store.members(&station_set_key(country)).await?;
    let mut obsolete: Vec<&String> = existing.difference(truth).collect();
    obsolete.sort();

    for station_id in &obsolete {
        let mut pipeline = CommandPipeline::atomic();
        pipeline
            .srem(station_set_key(country), station_id.as_str())
            .del(station_key(country, station_id))
            .zrem(location_key(country), station_id.as_str());
        store.execute(&pipeline).await?;
        debug!(station = %station_id, "Removed obsolete station");
    }

    info!(removed = obsolete.len(), "Reconciled station index");
    Ok(obsolete.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn station(id: &str) -> StoredStation {
        StoredStation {
            id: id.to_string(),
            name: format!("Station {}", id),
            latitude: 50.05,
            longitude: 8.6,
            altitude: 111.0,
            zoom_level: 8.5,
            forecast_only: true,
            metadata: vec![("DWD_ID".to_string(), "1420".to_string())],
        }
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let store = MemoryStore::new();
        store_station(&store, CountryId::Germany, &station("10637")).await.unwrap();

        assert_eq!(store.position("location:de", "10637"), Some((8.6, 50.05)));

        let stations = load_stations(&store, CountryId::Germany).await.unwrap();
        let stored = &stations["10637"];
        assert_eq!(stored["name"], "Station 10637");
        assert_eq!(stored["forecast_only"], "1");
        assert_eq!(stored["zoom_level"], "8.5");
        assert_eq!(stored["DWD_ID"], "1420");
    }

    #[tokio::test]
    async fn test_reconcile_scenario() {
        let store = MemoryStore::new();
        for id in ["A", "B", "C"] {
            store_station(&store, CountryId::Germany, &station(id)).await.unwrap();
        }
        let pipelines_before = store.pipelines_executed();

        let truth: HashSet<String> = ["B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let removed = reconcile_stations(&store, CountryId::Germany, &truth).await.unwrap();

        assert_eq!(removed, 1);
        let remaining: Vec<String> = store.set("station:de").into_iter().collect();
        assert_eq!(remaining, vec!["B", "C"]);
        assert!(store.hash("station:de:A").is_none());
        assert!(store.hash("station:de:B").is_some());
        assert_eq!(store.position("location:de", "A"), None);
        assert_eq!(store.pipelines_executed() - pipelines_before, 1);
    }

    #[tokio::test]
    async fn test_reconcile_empty_index() {
        let store = MemoryStore::new();
        let truth: HashSet<String> = ["A".to_string()].into_iter().collect();

        assert_eq!(reconcile_stations(&store, CountryId::Slovenia, &truth).await.unwrap(), 0);
        assert!(store.keys().is_empty());
    }
}
