//! Forecast elements and canonical weather condition categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked meteorological quantity.
///
/// Values are carried in SI units: kelvin, pascal, metres, metres per second,
/// seconds, degrees and percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    WindDirection,
    WindSpeed,
    WindGustSpeed,
    CloudCover,
    PressureMsl,
    Precipitation,
    Sunshine,
    DewPoint,
    Temperature,
    Visibility,
    /// Coded present/past weather (WMO SYNOP `ww` or observation codes)
    PresentWeather,
    RelativeHumidity,
}

impl Element {
    /// Field name in stored hashes.
    pub fn field_name(&self) -> &'static str {
        match self {
            Element::WindDirection => "wind_direction",
            Element::WindSpeed => "wind_speed",
            Element::WindGustSpeed => "wind_gust_speed",
            Element::CloudCover => "cloud_cover",
            Element::PressureMsl => "pressure_msl",
            Element::Precipitation => "precipitation",
            Element::Sunshine => "sunshine",
            Element::DewPoint => "dew_point",
            Element::Temperature => "temperature",
            Element::Visibility => "visibility",
            Element::PresentWeather => "present_weather",
            Element::RelativeHumidity => "relative_humidity",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Canonical weather condition categories exposed to consumers.
///
/// "No significant weather" is represented by the absence of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Dry,
    Fog,
    Rain,
    Snow,
    Sleet,
    Thunderstorm,
    Hail,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Dry => "dry",
            Condition::Fog => "fog",
            Condition::Rain => "rain",
            Condition::Snow => "snow",
            Condition::Sleet => "sleet",
            Condition::Thunderstorm => "thunderstorm",
            Condition::Hail => "hail",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
