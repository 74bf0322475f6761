use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RetrievalError;

/// Normalized cache key for a location: trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Normalize a raw location string. Empty (or whitespace-only) input is rejected.
    pub fn normalize(location_raw: &str) -> Result<Self, RetrievalError> {
        let key = location_raw.trim().to_lowercase();
        if key.is_empty() {
            return Err(RetrievalError::Validation(
                "you must specify a location".to_string(),
            ));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a [`WeatherResult`] was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Api,
}

/// Result of a weather lookup, as returned to callers.
///
/// Only `payload` is ever written to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    #[serde(rename = "data")]
    pub payload: serde_json::Value,
    pub source: Source,
    pub cached: bool,
}

impl WeatherResult {
    pub fn from_cache(payload: serde_json::Value) -> Self {
        Self { payload, source: Source::Cache, cached: true }
    }

    pub fn from_api(payload: serde_json::Value) -> Self {
        Self { payload, source: Source::Api, cached: false }
    }
}

/// Snapshot served by the stats query surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: String,
    pub total_keys: u64,
    pub uptime: String,
    pub cache_connected: bool,
    pub errors: u64,
    pub timestamp: DateTime<Utc>,
}
