//! Weather data ingestion library.
//!
//! Fetches forecasts, observations, maps and warnings from the upstream
//! services, normalizes them and writes them to the key-value store.
//!
//! # Sources
//!
//! - [`dwd`]: MOSMIX point forecasts, current station observations and the
//!   station catalogue
//! - [`arso`]: Slovenian weather snapshots, nowcast maps and stations
//! - [`meteoalarm`]: CAP warnings and the per-area alert index
//!
//! Every pipeline takes a [`storage::KeyValueStore`] and, where it talks to
//! the network, a [`download::Fetch`] implementation, so it can run against
//! the in-memory store and canned responses.

pub mod arso;
pub mod conditions;
pub mod download;
pub mod dwd;
pub mod error;
pub mod meteoalarm;
pub mod options;
pub mod sanitize;
pub mod stations;
pub mod units;

// Re-exports
pub use download::{Fetch, HttpClient, HttpOptions, StaticSource};
pub use error::{IngestionError, Result};
pub use options::PipelineOptions;
pub use stations::{
    load_local_stations, station_ids, store_stations, StationSource, StationStoreSummary,
};
