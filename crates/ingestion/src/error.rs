//! Error types for the ingestion crate.

use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse forecast document: {0}")]
    Parse(#[from] forecast_parser::ParseError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error(transparent)]
    Weather(#[from] weather_common::WeatherError),

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid XML at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl IngestionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        IngestionError::InvalidData(message.into())
    }

    /// The resource does not exist (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, IngestionError::Http { status: 404, .. })
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
