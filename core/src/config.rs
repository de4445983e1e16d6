//! Configuration for a live collection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::Filter;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Which rows a live collection mirrors, and the bounds it operates under.
///
/// Durations serialize as milliseconds so the host application can load collection settings from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Backend table / collection name
    pub collection: String,

    /// Scope of the rows to mirror (usually the signed-in user or family)
    #[serde(default)]
    pub filter: Filter,

    /// Upper bound for the initial fetch and every refetch
    #[serde(with = "millis", default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,

    /// Age after which an unconfirmed optimistic write stops suppressing remote events
    #[serde(with = "millis", default = "default_pending_ttl")]
    pub pending_ttl: Duration,

    /// How often expired pending writes are swept while no events arrive
    #[serde(with = "millis", default = "default_sweep_interval")]
    pub sweep_interval: Duration,
}

fn default_fetch_timeout() -> Duration { DEFAULT_FETCH_TIMEOUT }
fn default_pending_ttl() -> Duration { DEFAULT_PENDING_TTL }
fn default_sweep_interval() -> Duration { DEFAULT_SWEEP_INTERVAL }

impl CollectionConfig {
    pub fn builder(collection: impl Into<String>) -> CollectionConfigBuilder {
        CollectionConfigBuilder {
            collection: collection.into(),
            filter: Filter::all(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            pending_ttl: DEFAULT_PENDING_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(json) }
}

/// Builder for CollectionConfig with sensible defaults.
#[derive(Debug, Clone)]
pub struct CollectionConfigBuilder {
    collection: String,
    filter: Filter,
    fetch_timeout: Duration,
    pending_ttl: Duration,
    sweep_interval: Duration,
}

impl CollectionConfigBuilder {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        // a zero period would make tokio's interval panic
        self.sweep_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn build(self) -> CollectionConfig {
        CollectionConfig {
            collection: self.collection,
            filter: self.filter,
            fetch_timeout: self.fetch_timeout,
            pending_ttl: self.pending_ttl,
            sweep_interval: self.sweep_interval,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
