//! Batched writer.
//!
//! Records are queued and written in atomic pipelines of at most `limit`
//! records. What a record turns into is decided by a [`RecordSchema`], so
//! the same writer serves forecasts, observations, maps and deletions.

use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{CommandPipeline, KeyValueStore};

/// Records per pipeline unless configured otherwise.
pub const DEFAULT_BATCH_LIMIT: usize = 1000;

/// Translates a record into store commands.
pub trait RecordSchema: Send + Sync {
    type Record: Send;

    /// Append the commands for `record` to `pipeline`. May append nothing.
    fn process(&self, pipeline: &mut CommandPipeline, record: &Self::Record);
}

/// Totals reported by [`BatchedWriter::finish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub records: usize,
    pub flushes: usize,
}

/// Queue of records written to a store in fixed-size batches.
///
/// Call [`finish`](Self::finish) when the ingest body ends, on error paths
/// too, so the tail of the queue is written. A writer dropped with queued
/// records logs a warning.
pub struct BatchedWriter<'a, S: KeyValueStore + ?Sized, K: RecordSchema> {
    store: &'a S,
    schema: K,
    queue: Vec<K::Record>,
    limit: usize,
    summary: WriteSummary,
}

impl<'a, S: KeyValueStore + ?Sized, K: RecordSchema> BatchedWriter<'a, S, K> {
    pub fn new(store: &'a S, schema: K) -> Self {
        Self::with_limit(store, schema, DEFAULT_BATCH_LIMIT)
    }

    pub fn with_limit(store: &'a S, schema: K, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            store,
            schema,
            queue: Vec::with_capacity(limit),
            limit,
            summary: WriteSummary::default(),
        }
    }

    /// Queue a record, writing the queue first if it is full.
    pub async fn enqueue(&mut self, record: K::Record) -> Result<()> {
        if self.queue.len() >= self.limit {
            self.flush().await?;
        }
        self.queue.push(record);
        Ok(())
    }

    /// Write every queued record in one atomic pipeline. No-op when empty.
    pub async fn flush(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }

        let mut pipeline = CommandPipeline::atomic();
        for record in &self.queue {
            self.schema.process(&mut pipeline, record);
        }

        if !pipeline.is_empty() {
            self.store.execute(&pipeline).await?;
        }

        debug!(
            records = self.queue.len(),
            commands = pipeline.len(),
            "Flushed batch"
        );

        self.summary.records += self.queue.len();
        self.summary.flushes += 1;
        self.queue.clear();
        Ok(())
    }

    /// Write the remaining records and report totals.
    pub async fn finish(mut self) -> Result<WriteSummary> {
        self.flush().await?;
        Ok(self.summary)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn schema(&self) -> &K {
        &self.schema
    }
}

impl<S: KeyValueStore + ?Sized, K: RecordSchema> Drop for BatchedWriter<'_, S, K> {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            warn!(records = self.queue.len(), "Batched writer dropped with unwritten records");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    struct SetSchema;

    impl RecordSchema for SetSchema {
        type Record = u32;

        fn process(&self, pipeline: &mut CommandPipeline, record: &u32) {
            pipeline.sadd("numbers", record.to_string());
        }
    }

    #[tokio::test]
    async fn test_flush_completeness() {
        for (count, limit, flushes) in [(2500usize, 1000usize, 3usize), (2000, 1000, 2), (1, 1000, 1), (0, 1000, 0), (7, 3, 3)] {
            let store = MemoryStore::new();
            let mut writer = BatchedWriter::with_limit(&store, SetSchema, limit);
            for i in 0..count {
                writer.enqueue(i as u32).await.unwrap();
            }
            let summary = writer.finish().await.unwrap();

            assert_eq!(summary.records, count);
            assert_eq!(summary.flushes, flushes, "{} records in batches of {}", count, limit);
            assert_eq!(store.pipelines_executed(), flushes);
            assert_eq!(store.set("numbers").len(), count);
        }
    }

    #[tokio::test]
    async fn test_enqueue_flushes_only_when_full() {
        let store = MemoryStore::new();
        let mut writer = BatchedWriter::with_limit(&store, SetSchema, 2);

        writer.enqueue(1).await.unwrap();
        writer.enqueue(2).await.unwrap();
        assert_eq!(store.pipelines_executed(), 0);
        assert_eq!(writer.queued(), 2);

        writer.enqueue(3).await.unwrap();
        assert_eq!(store.pipelines_executed(), 1);
        assert_eq!(writer.queued(), 1);

        writer.finish().await.unwrap();
        assert_eq!(store.atomic_pipelines_executed(), 2);
    }
}
