//! ARSO (Slovenian Environment Agency) sources: the station list, weather
//! condition snapshots and nowcast maps.

mod maps;
mod stations;
mod weather;

pub use maps::{
    align_to_interval, ingest_maps, latest_map, map_records, MapRecord, MapType, ObservationType,
};
pub use stations::{read_station_json, zoom_level, ArsoStation};
pub use weather::{
    data_url, ingest_weather, parse_snapshot, wind_direction_degrees, WeatherRecord,
    WeatherSummary, DATA_IDS,
};

use serde::Deserialize;
use weather_common::WeatherError;

use crate::error::Result;

pub const BASE_URL: &str = "https://meteo.arso.gov.si";

fn uploads_url() -> String {
    format!("{}/uploads/probase/www", BASE_URL)
}

/// A numeric JSON field that ARSO publishes either as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Value(f64),
    Text(String),
}

impl Number {
    /// The numeric value; empty text is absent.
    pub fn value(&self, field: &str) -> Result<Option<f64>> {
        match self {
            Number::Value(value) => Ok(Some(*value)),
            Number::Text(text) if text.trim().is_empty() => Ok(None),
            Number::Text(text) => text.trim().parse::<f64>().map(Some).map_err(|_| {
                WeatherError::InvalidNumber {
                    field: field.to_string(),
                    value: text.clone(),
                }
                .into()
            }),
        }
    }
}

fn optional_number(field: &str, number: Option<&Number>) -> Result<Option<f64>> {
    match number {
        Some(number) => number.value(field),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_forms() {
        let parsed: Vec<Number> = serde_json::from_str(r#"[1.5, "2", "", " 3.25 "]"#).unwrap();
        let values: Vec<Option<f64>> = parsed.iter().map(|n| n.value("t").unwrap()).collect();
        assert_eq!(values, vec![Some(1.5), Some(2.0), None, Some(3.25)]);

        let bad = Number::Text("warm".to_string());
        assert!(bad.value("t").is_err());
        assert_eq!(optional_number("t", None).unwrap(), None);
    }
}
