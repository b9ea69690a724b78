//! Station identity records.

use serde::{Deserialize, Serialize};

/// A forecast/observation station as found in a station catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Stable identifier (WMO id for DWD stations)
    pub station_id: String,
    pub station_name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    /// Identifier in the national legacy numbering scheme
    pub legacy_id: Option<String>,
}

impl StationRecord {
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            station_name: None,
            lat: None,
            lon: None,
            altitude: None,
            legacy_id: None,
        }
    }

    pub fn with_position(mut self, lon: f64, lat: f64, altitude: f64) -> Self {
        self.lon = Some(lon);
        self.lat = Some(lat);
        self.altitude = Some(altitude);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.station_name = Some(name.into());
        self
    }
}
