//! Station index maintenance and station allow-lists.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use storage::{load_stations, reconcile_stations, store_station, KeyValueStore, StoredStation};
use tracing::{info, instrument};
use weather_common::CountryId;

use crate::download::HttpClient;
use crate::error::Result;
use crate::{arso, dwd};

/// Totals of a station store run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StationStoreSummary {
    pub stored: usize,
    pub removed: usize,
}

/// Store every station, then drop stored stations missing from the list.
#[instrument(skip_all, fields(country = %country, stations = stations.len()))]
pub async fn store_stations<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
    stations: &[StoredStation],
) -> Result<StationStoreSummary> {
    for station in stations {
        store_station(store, country, station).await?;
    }
    info!(stored = stations.len(), "Stations stored");

    let truth: HashSet<String> = stations.iter().map(|s| s.id.clone()).collect();
    let removed = reconcile_stations(store, country, &truth).await?;
    info!(removed, "Obsolete stations removed");

    Ok(StationStoreSummary {
        stored: stations.len(),
        removed,
    })
}

/// Read a local station list in the country's format: the DWD catalogue
/// CSV for Germany, the ARSO JSON list for Slovenia.
pub fn load_local_stations(country: CountryId, path: &Path) -> Result<Vec<StoredStation>> {
    let reader = BufReader::new(File::open(path)?);

    let stations = match country {
        CountryId::Germany => dwd::read_station_csv(reader)?
            .values()
            .map(dwd::DwdStation::to_stored)
            .collect(),
        CountryId::Slovenia => arso::read_station_json(reader)?
            .iter()
            .map(arso::ArsoStation::to_stored)
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(stations)
}

/// Where a pipeline takes its station allow-list from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationSource {
    /// Stations already in the store
    Store,
    /// A local station file
    Local(PathBuf),
    /// A remote roster service returning a JSON list of ids
    Roster { url: String, api_key: String },
}

/// Resolve station ids from `source`, sorted.
///
/// With `reporting_only`, forecast-only stations are left out. A roster
/// carries no such flag and is returned as is.
pub async fn station_ids<S: KeyValueStore + ?Sized>(
    source: &StationSource,
    store: &S,
    http: &HttpClient,
    country: CountryId,
    reporting_only: bool,
) -> Result<Vec<String>> {
    let ids: BTreeSet<String> = match source {
        StationSource::Store => load_stations(store, country)
            .await?
            .into_iter()
            .filter(|(_, fields)| {
                !reporting_only || fields.get("forecast_only").map(String::as_str) == Some("0")
            })
            .map(|(id, _)| id)
            .collect(),
        StationSource::Local(path) => load_local_stations(country, path)?
            .into_iter()
            .filter(|station| !reporting_only || !station.forecast_only)
            .map(|station| station.id)
            .collect(),
        StationSource::Roster { url, api_key } => http.roster(url, api_key).await?.into_iter().collect(),
    };

    info!(country = %country, source = ?source, stations = ids.len(), "Resolved station list");
    Ok(ids.into_iter().collect())
}
