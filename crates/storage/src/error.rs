//! Storage error types.

use thiserror::Error;

/// Errors from the key-value store. All of them are transient from the
/// point of view of an ingest run: retrying the run later may succeed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store command failed: {0}")]
    Command(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
