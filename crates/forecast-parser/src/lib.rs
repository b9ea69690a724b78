//! Streaming parser for DWD MOSMIX point-forecast documents.
//!
//! A MOSMIX bundle is a KMZ (zip) archive holding one very large KML
//! document: a product definition with the shared list of forecast time
//! steps, followed by one `Placemark` per station carrying a whitespace
//! separated value array per forecast element.
//!
//! The crate never materializes the document. [`DocumentCursor`] pulls
//! XML events and hands out one owned [`Placemark`] at a time, the readers
//! turn placemarks into [`StationRecord`]s or [`ForecastPoint`]s, and the
//! [`timesteps`] module decides which forecast instants are kept.
//!
//! [`StationRecord`]: weather_common::StationRecord
//! [`ForecastPoint`]: weather_common::ForecastPoint

pub mod archive;
pub mod cursor;
pub mod elements;
pub mod error;
pub mod extract;
pub mod reader;
pub mod timesteps;

pub use archive::KmzArchive;
pub use cursor::{DocumentCursor, DocumentEvent, Placemark};
pub use elements::{MISSING_VALUE, MOSMIX_ELEMENTS};
pub use error::{ParseError, Result};
pub use extract::{extract_forecast, extract_station, StationFilter, TimeContext};
pub use reader::{ForecastReader, ReaderStats, StationReader};
pub use timesteps::select;
