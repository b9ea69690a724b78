//! Storage layer for weather-ingest.
//!
//! Provides:
//! - A store-agnostic command pipeline and the [`KeyValueStore`] trait
//! - Redis and in-memory store implementations
//! - A batched writer with pluggable record schemas
//! - Time-bucketed keys with hour-aligned expiry
//! - Station and alert indexes

pub mod alerts;
pub mod batch;
pub mod error;
pub mod expiry;
pub mod memory;
pub mod redis_store;
pub mod schema;
pub mod stations;
pub mod store;

pub use batch::{BatchedWriter, RecordSchema, WriteSummary, DEFAULT_BATCH_LIMIT};
pub use error::{Result, StoreError};
pub use expiry::{ExpiryPolicy, CURRENT_CONDITION_MARGIN_MINUTES, FORECAST_MARGIN_MINUTES};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use schema::{
    BucketedRecord, TimeBucketSchema, CURRENT_DE_PREFIX, CURRENT_SI_PREFIX, FORECAST_SI_PREFIX,
    MAP_SI_PREFIX, MOSMIX_PREFIX,
};
pub use stations::{load_stations, reconcile_stations, store_station, StoredStation};
pub use store::{Command, CommandPipeline, KeyValueStore};
