//! In-process [`KeyValueStore`] for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::store::{Command, CommandPipeline, KeyValueStore};

#[derive(Debug, Default)]
struct State {
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, BTreeMap<String, String>>,
    geo: HashMap<String, BTreeMap<String, (f64, f64)>>,
    ttls: HashMap<String, i64>,
    pipelines: usize,
    atomic_pipelines: usize,
    fail_after: Option<usize>,
}

impl State {
    fn apply(&mut self, command: &Command) {
        match command {
            Command::SAdd { key, members } => {
                self.sets
                    .entry(key.clone())
                    .or_default()
                    .extend(members.iter().cloned());
            }
            Command::SRem { key, members } => {
                if let Some(set) = self.sets.get_mut(key) {
                    for member in members {
                        set.remove(member);
                    }
                    if set.is_empty() {
                        self.sets.remove(key);
                    }
                }
            }
            Command::HSet { key, fields } => {
                self.hashes
                    .entry(key.clone())
                    .or_default()
                    .extend(fields.iter().cloned());
            }
            Command::Expire { key, seconds } => {
                if self.exists(key) {
                    self.ttls.insert(key.clone(), *seconds);
                }
            }
            Command::Del { keys } => {
                for key in keys {
                    self.sets.remove(key);
                    self.hashes.remove(key);
                    self.geo.remove(key);
                    self.ttls.remove(key);
                }
            }
            Command::GeoAdd { key, lon, lat, member } => {
                self.geo
                    .entry(key.clone())
                    .or_default()
                    .insert(member.clone(), (*lon, *lat));
            }
            Command::ZRem { key, members } => {
                if let Some(index) = self.geo.get_mut(key) {
                    for member in members {
                        index.remove(member);
                    }
                }
            }
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.sets.contains_key(key) || self.hashes.contains_key(key) || self.geo.contains_key(key)
    }
}

/// Store keeping everything in process memory.
///
/// Expiry is recorded, not enforced, so tests can inspect the TTLs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Members of a set, sorted.
    pub fn set(&self, key: &str) -> BTreeSet<String> {
        self.lock().sets.get(key).cloned().unwrap_or_default()
    }

    pub fn hash(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.lock().hashes.get(key).cloned()
    }

    /// `(lon, lat)` of a member in a geo index.
    pub fn position(&self, key: &str, member: &str) -> Option<(f64, f64)> {
        self.lock().geo.get(key).and_then(|index| index.get(member).copied())
    }

    /// Last expiry set on a key, in seconds.
    pub fn ttl(&self, key: &str) -> Option<i64> {
        self.lock().ttls.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().exists(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let state = self.lock();
        let mut keys: Vec<String> = state
            .sets
            .keys()
            .chain(state.hashes.keys())
            .chain(state.geo.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Number of pipelines executed so far.
    pub fn pipelines_executed(&self) -> usize {
        self.lock().pipelines
    }

    pub fn atomic_pipelines_executed(&self) -> usize {
        self.lock().atomic_pipelines
    }

    /// Reject every pipeline after the next `count` with a command error.
    pub fn fail_after(&self, count: usize) {
        let mut state = self.lock();
        state.fail_after = Some(state.pipelines + count);
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn execute(&self, pipeline: &CommandPipeline) -> Result<()> {
        let mut state = self.lock();
        if state.fail_after.is_some_and(|limit| state.pipelines >= limit) {
            return Err(StoreError::Command("pipeline rejected".to_string()));
        }
        for command in pipeline.commands() {
            state.apply(command);
        }
        state.pipelines += 1;
        if pipeline.is_atomic() {
            state.atomic_pipelines += 1;
        }
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self
            .lock()
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hashes(&self, keys: &[String]) -> Result<Vec<HashMap<String, String>>> {
        let state = self.lock();
        Ok(keys
            .iter()
            .map(|key| {
                state
                    .hashes
                    .get(key)
                    .map(|hash| hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pipeline_application() {
        let store = MemoryStore::new();
        let mut pipeline = CommandPipeline::atomic();
        pipeline
            .sadd("station:de", "10637")
            .geoadd("location:de", 8.6, 50.05, "10637")
            .hset("station:de:10637", [("name", "FRANKFURT/M")])
            .expire("station:de:10637", 3600)
            .expire("missing", 10);
        store.execute(&pipeline).await.unwrap();

        assert!(store.set("station:de").contains("10637"));
        assert_eq!(store.position("location:de", "10637"), Some((8.6, 50.05)));
        assert_eq!(store.ttl("station:de:10637"), Some(3600));
        assert_eq!(store.ttl("missing"), None);
        assert_eq!(store.pipelines_executed(), 1);
        assert_eq!(store.atomic_pipelines_executed(), 1);

        let mut cleanup = CommandPipeline::new();
        cleanup
            .srem("station:de", "10637")
            .del("station:de:10637")
            .zrem("location:de", "10637");
        store.execute(&cleanup).await.unwrap();

        assert!(store.set("station:de").is_empty());
        assert!(store.hash("station:de:10637").is_none());
        assert_eq!(store.position("location:de", "10637"), None);
        assert_eq!(store.atomic_pipelines_executed(), 1);
    }

    #[tokio::test]
    async fn test_fail_after() {
        let store = MemoryStore::new();
        let mut pipeline = CommandPipeline::new();
        pipeline.sadd("a", "1");

        store.fail_after(1);
        store.execute(&pipeline).await.unwrap();
        assert!(matches!(store.execute(&pipeline).await, Err(StoreError::Command(_))));
        assert_eq!(store.pipelines_executed(), 1);
    }

    #[tokio::test]
    async fn test_reads() {
        let store = MemoryStore::new();
        let mut pipeline = CommandPipeline::new();
        pipeline.hset("a", [("x", "1")]);
        store.execute(&pipeline).await.unwrap();

        assert!(store.members("nothing").await.unwrap().is_empty());
        let hashes = store.hashes(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(hashes[0].get("x").map(String::as_str), Some("1"));
        assert!(hashes[1].is_empty());
    }
}
