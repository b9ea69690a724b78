//! Store-agnostic command pipelines.
//!
//! Writers describe their changes as a [`CommandPipeline`] and hand it to a
//! [`KeyValueStore`], which runs it in one round trip. Only the handful of
//! commands the ingest jobs need are modelled.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::Result;

/// A single store command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SAdd { key: String, members: Vec<String> },
    SRem { key: String, members: Vec<String> },
    HSet { key: String, fields: Vec<(String, String)> },
    Expire { key: String, seconds: i64 },
    Del { keys: Vec<String> },
    GeoAdd { key: String, lon: f64, lat: f64, member: String },
    ZRem { key: String, members: Vec<String> },
}

/// An ordered batch of commands executed in one round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandPipeline {
    commands: Vec<Command>,
    atomic: bool,
}

impl CommandPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline applied all-or-nothing (MULTI/EXEC on Redis).
    pub fn atomic() -> Self {
        Self {
            commands: Vec::new(),
            atomic: true,
        }
    }

    pub fn sadd(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.commands.push(Command::SAdd {
            key: key.into(),
            members: vec![member.into()],
        });
        self
    }

    pub fn srem(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.commands.push(Command::SRem {
            key: key.into(),
            members: vec![member.into()],
        });
        self
    }

    /// Set hash fields. An empty field list is not recorded.
    pub fn hset<K, V>(&mut self, key: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if !fields.is_empty() {
            self.commands.push(Command::HSet {
                key: key.into(),
                fields,
            });
        }
        self
    }

    pub fn expire(&mut self, key: impl Into<String>, seconds: i64) -> &mut Self {
        self.commands.push(Command::Expire {
            key: key.into(),
            seconds,
        });
        self
    }

    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Del {
            keys: vec![key.into()],
        });
        self
    }

    pub fn geoadd(&mut self, key: impl Into<String>, lon: f64, lat: f64, member: impl Into<String>) -> &mut Self {
        self.commands.push(Command::GeoAdd {
            key: key.into(),
            lon,
            lat,
            member: member.into(),
        });
        self
    }

    pub fn zrem(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.commands.push(Command::ZRem {
            key: key.into(),
            members: vec![member.into()],
        });
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A key-value store supporting sets, hashes, a geo index and key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Run every command of the pipeline in one round trip.
    async fn execute(&self, pipeline: &CommandPipeline) -> Result<()>;

    /// Members of a set. A missing key is an empty set.
    async fn members(&self, key: &str) -> Result<HashSet<String>>;

    /// All fields of several hashes, in key order. Missing keys give empty maps.
    async fn hashes(&self, keys: &[String]) -> Result<Vec<HashMap<String, String>>>;
}
