//! Redis-backed [`KeyValueStore`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, IntoConnectionInfo};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::store::{Command, CommandPipeline, KeyValueStore};

/// Redis client on a multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to Redis and select a logical database.
    pub async fn connect(redis_url: &str, database: i64) -> Result<Self> {
        let mut info = redis_url
            .into_connection_info()
            .map_err(|e| StoreError::Connection(format!("Invalid Redis URL: {}", e)))?;
        info.redis.db = database;

        let client = Client::open(info)
            .map_err(|e| StoreError::Connection(format!("Redis connection failed: {}", e)))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(format!("Redis connection failed: {}", e)))?;

        info!(database, "Connected to Redis");

        Ok(Self { conn })
    }
}

fn to_redis_pipeline(pipeline: &CommandPipeline) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    if pipeline.is_atomic() {
        pipe.atomic();
    }

    for command in pipeline.commands() {
        match command {
            Command::SAdd { key, members } => {
                pipe.sadd(key, members).ignore();
            }
            Command::SRem { key, members } => {
                pipe.srem(key, members).ignore();
            }
            Command::HSet { key, fields } => {
                pipe.hset_multiple(key, fields).ignore();
            }
            Command::Expire { key, seconds } => {
                pipe.expire(key, *seconds).ignore();
            }
            Command::Del { keys } => {
                pipe.del(keys).ignore();
            }
            Command::GeoAdd { key, lon, lat, member } => {
                pipe.cmd("GEOADD").arg(key).arg(*lon).arg(*lat).arg(member).ignore();
            }
            Command::ZRem { key, members } => {
                pipe.zrem(key, members).ignore();
            }
        }
    }

    pipe
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn execute(&self, pipeline: &CommandPipeline) -> Result<()> {
        if pipeline.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let _: () = to_redis_pipeline(pipeline)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(format!("Pipeline failed: {}", e)))?;

        debug!(commands = pipeline.len(), atomic = pipeline.is_atomic(), "Executed pipeline");
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<HashSet<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key)
            .await
            .map_err(|e| StoreError::Command(format!("SMEMBERS {} failed: {}", key, e)))
    }

    async fn hashes(&self, keys: &[String]) -> Result<Vec<HashMap<String, String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.hgetall(key);
        }

        let mut conn = self.conn.clone();
        pipe.query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(format!("HGETALL pipeline failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_translation() {
        let mut pipeline = CommandPipeline::atomic();
        pipeline
            .sadd("station:si", "LJUBL-ANA_BRNIK")
            .geoadd("location:si", 14.47, 46.22, "LJUBL-ANA_BRNIK")
            .hset("station:si:LJUBL-ANA_BRNIK", [("name", "Brnik")]);

        let pipe = to_redis_pipeline(&pipeline);
        let packed = String::from_utf8_lossy(&pipe.get_packed_pipeline()).to_string();

        assert!(packed.contains("MULTI"));
        assert!(packed.contains("SADD"));
        assert!(packed.contains("GEOADD"));
        assert!(packed.contains("HMSET") || packed.contains("HSET"));
        assert!(packed.contains("EXEC"));
    }
}
