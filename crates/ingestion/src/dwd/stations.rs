//! DWD station catalogue.
//!
//! The catalogue is a header-less CSV with one MOSMIX station per row. It is
//! regenerated from the station list of the latest MOSMIX bundle, keeping
//! the hand-curated columns (name, type, admin level, status) of stations
//! that were already known.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, Read, Write};

use forecast_parser::StationReader;
use serde::{Deserialize, Serialize};
use storage::StoredStation;
use tracing::{debug, info};

use crate::error::Result;

/// Marker of pseudo stations that only exist in the forecast grid.
const PSEUDO_STATION_MARKER: &str = "SWIS-PUNKT";

/// One catalogue row. Column order is the file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwdStation {
    pub station_id: String,
    pub dwd_station_id: String,
    pub has_reports: u8,
    pub station_name: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    #[serde(rename = "type")]
    pub location_type: String,
    pub admin: String,
    pub status: String,
}

impl DwdStation {
    pub fn has_reports(&self) -> bool {
        self.has_reports != 0
    }

    pub fn zoom_level(&self) -> f64 {
        zoom_level(&self.location_type, &self.admin)
    }

    pub fn to_stored(&self) -> StoredStation {
        StoredStation {
            id: self.station_id.clone(),
            name: self.name.clone(),
            latitude: self.lat,
            longitude: self.lon,
            altitude: self.altitude,
            zoom_level: self.zoom_level(),
            forecast_only: !self.has_reports(),
            metadata: vec![
                ("status".to_string(), self.status.clone()),
                ("DWD_ID".to_string(), self.dwd_station_id.clone()),
            ],
        }
    }

    fn catalogue_order(&self, other: &Self) -> Ordering {
        self.station_id
            .cmp(&other.station_id)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.lon.total_cmp(&other.lon))
            .then_with(|| self.lat.total_cmp(&other.lat))
    }
}

/// Map zoom level from the location type and administrative level.
///
/// A missing or unreadable admin level counts as the coarsest one.
pub fn zoom_level(location_type: &str, admin: &str) -> f64 {
    let admin_level = admin.trim().parse::<f64>().unwrap_or(0.0);

    if admin_level >= 10.0 {
        10.35
    } else if admin_level >= 9.0 {
        9.9
    } else if admin_level >= 8.0 {
        match location_type {
            "town" => 8.5,
            "village" | "suburb" => 9.1,
            _ => 9.5,
        }
    } else {
        7.5
    }
}

/// Read a station catalogue keyed by station id.
pub fn read_station_csv<R: Read>(reader: R) -> Result<BTreeMap<String, DwdStation>> {
    let mut csv = csv::ReaderBuilder::new().has_headers(false).from_reader(reader);

    let mut stations = BTreeMap::new();
    for row in csv.deserialize() {
        let station: DwdStation = row?;
        stations.insert(station.station_id.clone(), station);
    }

    debug!(stations = stations.len(), "Read DWD station catalogue");
    Ok(stations)
}

/// Read the first column of a header-less CSV as a set of ids.
pub fn read_id_list<R: Read>(reader: R) -> Result<HashSet<String>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut ids = HashSet::new();
    for row in csv.records() {
        if let Some(id) = row?.get(0).map(str::trim).filter(|id| !id.is_empty()) {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

/// Curated station lists applied when regenerating the catalogue.
#[derive(Debug, Clone, Default)]
pub struct StationLists {
    /// Stations publishing observations. `None` keeps the previous flag.
    pub with_reports: Option<HashSet<String>>,
    /// Always kept, even when ignored.
    pub included: HashSet<String>,
    pub ignored: HashSet<String>,
}

impl StationLists {
    fn accepts(&self, station_id: &str) -> bool {
        self.included.contains(station_id) || !self.ignored.contains(station_id)
    }
}

/// Regenerated catalogue split into curated and new stations.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    /// Stations with a curated name
    pub known: Vec<DwdStation>,
    /// Stations still waiting for curation
    pub new: Vec<DwdStation>,
    pub pseudo_skipped: usize,
    pub ignored: usize,
}

/// Build the catalogue from the stations of a MOSMIX document.
pub fn build_catalogue<R: BufRead>(
    reader: &mut StationReader<R>,
    previous: &BTreeMap<String, DwdStation>,
    lists: &StationLists,
) -> Result<Catalogue> {
    let mut catalogue = Catalogue::default();
    let mut stations = Vec::new();

    while let Some(record) = reader.next_station()? {
        let station_name = record.station_name.clone().unwrap_or_default();
        if station_name.contains(PSEUDO_STATION_MARKER) {
            catalogue.pseudo_skipped += 1;
            continue;
        }

        let id = record.station_id.clone();
        let known = previous.get(&id);

        let has_reports = match &lists.with_reports {
            Some(reporting) => reporting.contains(&id),
            None => known.map(DwdStation::has_reports).unwrap_or(false),
        };

        let dwd_station_id = record
            .legacy_id
            .as_deref()
            .or_else(|| known.map(|s| s.dwd_station_id.as_str()))
            .map(normalize_legacy_id)
            .unwrap_or_default();

        stations.push(DwdStation {
            station_id: id,
            dwd_station_id,
            has_reports: u8::from(has_reports),
            station_name,
            name: known.map(|s| s.name.clone()).unwrap_or_default(),
            lat: record.lat.unwrap_or_default(),
            lon: record.lon.unwrap_or_default(),
            altitude: record.altitude.unwrap_or_default(),
            location_type: known.map(|s| s.location_type.clone()).unwrap_or_default(),
            admin: known.map(|s| s.admin.clone()).unwrap_or_default(),
            status: known.map(|s| s.status.clone()).unwrap_or_default(),
        });
    }

    stations.sort_by(DwdStation::catalogue_order);

    for station in stations {
        if !lists.accepts(&station.station_id) {
            catalogue.ignored += 1;
        } else if station.name.is_empty() {
            catalogue.new.push(station);
        } else {
            catalogue.known.push(station);
        }
    }

    info!(
        known = catalogue.known.len(),
        new = catalogue.new.len(),
        ignored = catalogue.ignored,
        pseudo = catalogue.pseudo_skipped,
        "Built DWD station catalogue"
    );
    Ok(catalogue)
}

/// Legacy ids are stored without leading zeros.
fn normalize_legacy_id(id: &str) -> String {
    let id = id.trim();
    match id.parse::<u64>() {
        Ok(number) => number.to_string(),
        Err(_) => id.to_string(),
    }
}

/// Write stations as header-less catalogue rows.
pub fn write_station_csv<W: Write>(writer: W, stations: &[DwdStation]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for station in stations {
        csv.serialize(station)?;
    }
    csv.flush()?;
    Ok(())
}
