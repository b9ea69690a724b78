use std::io::Read;

use serde::Deserialize;
use storage::StoredStation;
use tracing::debug;

use super::{optional_number, Number};
use crate::error::{IngestionError, Result};

/// A station from the ARSO station list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArsoStation {
    pub id: String,
    pub title: String,
    pub latitude: Number,
    pub longitude: Number,
    pub altitude: Option<Number>,
    #[serde(rename = "zoomLevel")]
    pub zoom_level: Number,
    #[serde(default)]
    pub country: String,
    #[serde(rename = "parentId", default)]
    pub parent_id: String,
}

impl ArsoStation {
    pub fn to_stored(&self) -> Result<StoredStation> {
        let required = |field: &str, number: &Number| -> Result<f64> {
            number.value(field)?.ok_or_else(|| {
                IngestionError::invalid(format!("station {} has no {}", self.id, field))
            })
        };

        Ok(StoredStation {
            id: self.id.clone(),
            name: self.title.clone(),
            latitude: required("latitude", &self.latitude)?,
            longitude: required("longitude", &self.longitude)?,
            altitude: optional_number("altitude", self.altitude.as_ref())?.unwrap_or_default(),
            zoom_level: zoom_level(required("zoomLevel", &self.zoom_level)?),
            forecast_only: false,
            metadata: vec![
                ("country".to_string(), self.country.clone()),
                ("region".to_string(), self.parent_id.trim_matches('_').to_string()),
            ],
        })
    }
}

/// Read the ARSO station list. Ids lose their `_` padding.
pub fn read_station_json<R: Read>(reader: R) -> Result<Vec<ArsoStation>> {
    let mut stations: Vec<ArsoStation> = serde_json::from_reader(reader)?;
    for station in &mut stations {
        station.id = station.id.trim_matches('_').to_string();
    }

    debug!(stations = stations.len(), "Read ARSO station list");
    Ok(stations)
}

/// Convert an ARSO zoom level (3 to 6) to the map zoom used by clients.
pub fn zoom_level(arso_level: f64) -> f64 {
    const MAX_ZOOM: f64 = 11.0;
    const MIN_ZOOM: f64 = 7.5;
    const EPSILON: f64 = 0.25;

    let level = if arso_level == 5.0 { 6.0 } else { arso_level };
    let scaled = level / 6.0 * (MAX_ZOOM - MIN_ZOOM - EPSILON);
    MAX_ZOOM - scaled - EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{arso_stations_json, assert_approx_eq};

    #[test]
    fn test_zoom_level() {
        assert_approx_eq!(zoom_level(5.0), 7.5, 1e-9);
        assert_approx_eq!(zoom_level(6.0), 7.5, 1e-9);
        assert_approx_eq!(zoom_level(3.0), 9.125, 1e-9);
    }

    #[test]
    fn test_read_stations() {
        let stations = read_station_json(arso_stations_json().as_bytes()).unwrap();
        assert_eq!(stations.len(), 2);

        let ljubljana = stations[0].to_stored().unwrap();
        assert_eq!(ljubljana.id, "LJUBL-ANA_BEZIGRAD");
        assert_eq!(ljubljana.altitude, 299.0);
        assert_approx_eq!(ljubljana.latitude, 46.0658, 1e-9);
        assert!(ljubljana
            .metadata
            .contains(&("region".to_string(), "SI_OSREDNJESLOVENSKA".to_string())));

        let koper = stations[1].to_stored().unwrap();
        assert_approx_eq!(koper.longitude, 13.7295, 1e-9);
        assert_approx_eq!(koper.zoom_level, 9.125, 1e-9);
    }
}
