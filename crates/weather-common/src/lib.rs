//! Common types and utilities shared across all weather-ingest crates.

pub mod alert;
pub mod country;
pub mod element;
pub mod error;
pub mod point;
pub mod station;
pub mod time;

pub use alert::{
    AlertCertainty, AlertInfo, AlertResponseType, AlertSeverity, AlertText, AlertType, AlertUrgency,
};
pub use country::{CountryId, LanguageId};
pub use element::{Condition, Element};
pub use error::{WeatherError, WeatherResult};
pub use point::ForecastPoint;
pub use station::StationRecord;
pub use time::{floor_hour, parse_timestamp, timestamp_key};
