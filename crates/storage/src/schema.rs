//! Time-bucketed key layout.
//!
//! Every record lands in two keys sharing one expiry:
//!
//! - `{prefix}:{timestamp_ms}`: set of members valid at that instant
//! - `{prefix}:{timestamp_ms}:{member}`: hash with the record's fields

use std::marker::PhantomData;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use weather_common::{timestamp_key, Element, ForecastPoint};

use crate::batch::RecordSchema;
use crate::expiry::ExpiryPolicy;
use crate::store::CommandPipeline;

/// DWD MOSMIX forecasts
pub const MOSMIX_PREFIX: &str = "mosmix:de";
/// DWD current observations
pub const CURRENT_DE_PREFIX: &str = "current:de";
/// ARSO forecast snapshots
pub const FORECAST_SI_PREFIX: &str = "forecast:si";
/// ARSO nowcast snapshot
pub const CURRENT_SI_PREFIX: &str = "current:si";
/// ARSO map tiles
pub const MAP_SI_PREFIX: &str = "map:si";

/// A record stored under a timestamp bucket.
pub trait BucketedRecord: Send + Sync {
    fn timestamp(&self) -> DateTime<Utc>;

    /// Member id inside the bucket set.
    fn member(&self) -> String;

    /// Hash fields; absent values are left out.
    fn fields(&self) -> Vec<(String, String)>;

    /// Per-record expiry margin overriding the schema's policy.
    fn expiry_margin(&self) -> Option<TimeDelta> {
        None
    }
}

impl BucketedRecord for ForecastPoint {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn member(&self) -> String {
        self.station_id.clone()
    }

    fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("station_id".to_string(), self.station_id.clone()),
            ("source".to_string(), self.source.clone()),
            ("timestamp".to_string(), timestamp_key(self.timestamp)),
        ];

        // the raw weather code is replaced by the derived condition
        fields.extend(
            self.values
                .iter()
                .filter(|(element, _)| **element != Element::PresentWeather)
                .filter_map(|(element, value)| {
                    value.map(|v| (element.field_name().to_string(), v.to_string()))
                }),
        );

        if let Some(condition) = self.condition {
            fields.push(("condition".to_string(), condition.as_str().to_string()));
        }

        fields
    }
}

/// Schema writing [`BucketedRecord`]s under `prefix` with expiring keys.
///
/// The reference time is fixed at construction so every record of a run
/// is measured against the same hour.
pub struct TimeBucketSchema<R> {
    prefix: String,
    policy: ExpiryPolicy,
    now: DateTime<Utc>,
    _record: PhantomData<fn(&R)>,
}

impl<R> TimeBucketSchema<R> {
    pub fn new(prefix: impl Into<String>, policy: ExpiryPolicy, now: DateTime<Utc>) -> Self {
        Self {
            prefix: prefix.into(),
            policy,
            now,
            _record: PhantomData,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn bucket_key(&self, timestamp: DateTime<Utc>) -> String {
        format!("{}:{}", self.prefix, timestamp_key(timestamp))
    }
}

impl<R: BucketedRecord> RecordSchema for TimeBucketSchema<R> {
    type Record = R;

    fn process(&self, pipeline: &mut CommandPipeline, record: &R) {
        let timestamp = record.timestamp();
        let policy = record
            .expiry_margin()
            .map(ExpiryPolicy::new)
            .unwrap_or(self.policy);
        let ttl = policy.ttl_seconds(timestamp, self.now);

        if ttl <= 0 {
            debug!(
                prefix = %self.prefix,
                member = %record.member(),
                timestamp = %timestamp,
                "Skipping already expired record"
            );
            return;
        }

        let set_key = self.bucket_key(timestamp);
        let member = record.member();
        let hash_key = format!("{}:{}", set_key, member);

        pipeline
            .sadd(set_key.as_str(), member)
            .expire(set_key, ttl)
            .hset(hash_key.as_str(), record.fields())
            .expire(hash_key, ttl);
    }
}
