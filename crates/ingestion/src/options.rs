use storage::{ExpiryPolicy, DEFAULT_BATCH_LIMIT};

/// Settings shared by the ingest pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Records per store pipeline
    pub batch_limit: usize,
    pub forecast_expiry: ExpiryPolicy,
    pub current_expiry: ExpiryPolicy,
    /// Stop after the first record or station
    pub test_mode: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            forecast_expiry: ExpiryPolicy::forecast(),
            current_expiry: ExpiryPolicy::current_condition(),
            test_mode: false,
        }
    }
}
