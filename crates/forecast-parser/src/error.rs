//! Error types for the forecast parser.

use thiserror::Error;

/// Errors that abort parsing of a forecast document.
///
/// All of these are structural: re-reading the same document reproduces
/// them, so callers should not retry.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Archive contains no files")]
    EmptyArchive,

    #[error("Document contains more than one forecast time-step list")]
    DuplicateTimeSteps,

    #[error("Placemark '{0}' appears before the forecast time-step list")]
    MissingTimeSteps(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Station {station}: missing forecast element {element}")]
    MissingElement { station: String, element: String },

    #[error("Station {station}: element {element} has {found} values, expected {expected}")]
    CardinalityMismatch {
        station: String,
        element: String,
        expected: usize,
        found: usize,
    },

    #[error("Station {station}: invalid value '{value}' for element {element}")]
    InvalidValue {
        station: String,
        element: String,
        value: String,
    },

    #[error("Station {station}: invalid coordinates '{value}'")]
    InvalidCoordinates { station: String, value: String },
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParseError>;
