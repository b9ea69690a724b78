//! Error types shared by the weather-ingest crates.

use thiserror::Error;

/// Result type alias using WeatherError.
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Errors raised while interpreting domain values.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Unknown {kind} value: '{value}'")]
    UnknownEnumeration { kind: &'static str, value: String },

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Invalid number '{value}' for {field}")]
    InvalidNumber { field: String, value: String },
}

impl WeatherError {
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        WeatherError::UnknownEnumeration {
            kind,
            value: value.into(),
        }
    }
}
