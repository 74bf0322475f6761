//! Cache-aside weather retrieval.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheBackend, ConnectionSupervisor, DEFAULT_TTL_SECS, MemoryBackend, RedisBackend, SafeCache,
};
use crate::config::{CacheBackendKind, Config};
use crate::error::{CacheError, CacheResult, RetrievalError};
use crate::model::{CacheKey, StatsReport, WeatherResult};
use crate::provider::{WeatherProvider, default_provider_from_config};
use crate::stats::CacheStats;

/// Serves weather lookups from the cache when possible and from the
/// upstream provider otherwise.
///
/// Concurrent misses for the same location are not coalesced: each one calls
/// the provider and writes the cache, and the last write wins.
#[derive(Debug, Clone)]
pub struct WeatherService {
    cache: SafeCache,
    provider: Arc<dyn WeatherProvider>,
    stats: Arc<CacheStats>,
}

impl WeatherService {
    pub fn new(
        cache: SafeCache,
        provider: Arc<dyn WeatherProvider>,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self { cache, provider, stats }
    }

    /// Build the service described by `config` and try to connect the cache once.
    ///
    /// A failed connection is logged and the service runs without caching.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let supervisor = Arc::new(ConnectionSupervisor::new());
        let stats = Arc::new(CacheStats::new());

        let backend: Arc<dyn CacheBackend> = match config.cache.backend {
            CacheBackendKind::Redis => {
                Arc::new(RedisBackend::open(&config.cache.redis_url(), supervisor.clone())?)
            }
            CacheBackendKind::Memory => Arc::new(MemoryBackend::new(supervisor.clone())),
        };

        if let Err(err) = backend.connect().await {
            warn!(backend = backend.name(), error = %err, "Cache unavailable, running without cache");
        }

        let provider = default_provider_from_config(config)?;
        let cache = SafeCache::new(backend, supervisor, stats.clone());
        Ok(Self::new(cache, provider, stats))
    }

    pub async fn get_weather(&self, location_raw: &str) -> Result<WeatherResult, RetrievalError> {
        let key = CacheKey::normalize(location_raw)?;

        if let Some(payload) = self.cached_payload(&key).await {
            self.stats.record_hit();
            debug!(%key, "Cache HIT");
            return Ok(WeatherResult::from_cache(payload));
        }

        self.stats.record_miss();
        info!(%key, provider = %self.provider.id(), "Cache MISS, fetching from upstream");

        let payload = self.provider.fetch(location_raw).await.map_err(|err| {
            warn!(%key, error = %err, "Upstream fetch failed");
            RetrievalError::from(err)
        })?;

        self.store(&key, &payload).await;
        Ok(WeatherResult::from_api(payload))
    }

    /// Drop the cached entry for a location. `Ok(false)` when the cache could not be reached.
    pub async fn invalidate(&self, location_raw: &str) -> Result<bool, RetrievalError> {
        let key = CacheKey::normalize(location_raw)?;
        Ok(self.cache.delete(key.as_str()).await)
    }

    /// Current statistics, including the live key count and connection status.
    pub async fn stats(&self) -> StatsReport {
        StatsReport {
            cache_hits: self.stats.hits(),
            cache_misses: self.stats.misses(),
            hit_rate: self.stats.hit_rate(),
            total_keys: self.cache.size().await,
            uptime: self.stats.uptime(),
            cache_connected: self.cache.is_ready(),
            errors: self.stats.errors(),
            timestamp: Utc::now(),
        }
    }

    pub fn cache(&self) -> &SafeCache {
        &self.cache
    }

    pub async fn shutdown(&self) {
        self.cache.disconnect().await;
    }

    async fn cached_payload(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let raw = self.cache.get(key.as_str()).await?;
        match decode_entry(&raw) {
            Ok(payload) => Some(payload),
            Err(err) => {
                self.stats.record_error();
                warn!(%key, error = %err, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, payload: &serde_json::Value) {
        let serialized = match encode_entry(payload) {
            Ok(s) => s,
            Err(err) => {
                self.stats.record_error();
                warn!(%key, error = %err, "Failed to serialize payload for cache");
                return;
            }
        };

        if self.cache.set(key.as_str(), &serialized, DEFAULT_TTL_SECS).await {
            debug!(%key, "Cached upstream payload");
        } else {
            warn!(%key, "Payload not cached");
        }
    }
}

fn decode_entry(raw: &str) -> CacheResult<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| CacheError::Serialization(e.to_string()))
}

fn encode_entry(payload: &serde_json::Value) -> CacheResult<String> {
    serde_json::to_string(payload).map_err(|e| CacheError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::ProviderId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
        async fn fetch(&self, location: &str) -> Result<serde_json::Value, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({ "name": location, "call": n }))
        }

        fn id(&self) -> ProviderId {
            ProviderId::OpenWeather
        }
    }

    async fn service() -> (WeatherService, Arc<MemoryBackend>, Arc<CountingProvider>) {
        let supervisor = Arc::new(ConnectionSupervisor::new());
        let stats = Arc::new(CacheStats::new());
        let store = Arc::new(MemoryBackend::new(supervisor.clone()));
        store.connect().await.unwrap();
        let provider = Arc::new(CountingProvider::default());
        let cache = SafeCache::new(store.clone(), supervisor, stats.clone());
        (WeatherService::new(cache, provider.clone(), stats), store, provider)
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let (svc, _, provider) = service().await;

        let first = svc.get_weather("London").await.unwrap();
        let second = svc.get_weather("london ").await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.payload, second.payload);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_receives_raw_location() {
        let (svc, _, _) = service().await;
        let result = svc.get_weather("New York").await.unwrap();
        assert_eq!(result.payload["name"], "New York");
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let (svc, store, provider) = service().await;
        store.set("paris", "{not json", 60).await.unwrap();

        let result = svc.get_weather("Paris").await.unwrap();
        assert!(!result.cached);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let report = svc.stats().await;
        assert_eq!(report.errors, 1);
        assert_eq!(report.cache_misses, 1);
        assert_eq!(report.cache_hits, 0);
    }

    #[test]
    fn undecodable_entry_is_a_serialization_error() {
        let err = decode_entry("{not json").unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)), "got {err:?}");
        assert!(err.to_string().starts_with("Cache serialization error"));
    }

    #[test]
    fn entries_are_stored_as_compact_json() {
        let payload = serde_json::json!({"name": "Oslo", "main": {"temp": -3.5}});
        let raw = encode_entry(&payload).unwrap();
        assert!(!raw.contains('\n'));
        assert_eq!(decode_entry(&raw).unwrap(), payload);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (svc, _, provider) = service().await;
        svc.get_weather("Rome").await.unwrap();
        assert!(svc.invalidate(" ROME").await.unwrap());

        let again = svc.get_weather("Rome").await.unwrap();
        assert!(!again.cached);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn blank_location_is_rejected_without_touching_stats() {
        let (svc, _, provider) = service().await;
        let err = svc.get_weather("  ").await.unwrap_err();

        assert!(matches!(err, RetrievalError::Validation(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        let report = svc.stats().await;
        assert_eq!(report.cache_hits + report.cache_misses, 0);
    }

    #[tokio::test]
    async fn stats_queries_do_not_change_errors_while_disconnected() {
        let supervisor = Arc::new(ConnectionSupervisor::new());
        let stats = Arc::new(CacheStats::new());
        let store = Arc::new(MemoryBackend::new(supervisor.clone()));
        let cache = SafeCache::new(store, supervisor, stats.clone());
        let svc = WeatherService::new(cache, Arc::new(CountingProvider::default()), stats);

        let first = svc.stats().await;
        let second = svc.stats().await;
        assert!(!first.cache_connected);
        assert_eq!(first.total_keys, 0);
        assert_eq!(first.errors, 0);
        assert_eq!(second.errors, first.errors);
    }

    #[tokio::test]
    async fn memory_backend_from_config() {
        let mut config = Config::default();
        config.cache.backend = CacheBackendKind::Memory;
        config.upsert_provider_api_key(ProviderId::OpenWeather, "key".into());

        let svc = WeatherService::from_config(&config).await.unwrap();
        assert!(svc.cache().is_ready());
        assert_eq!(svc.cache().backend_name(), "memory");

        svc.shutdown().await;
        assert!(!svc.cache().is_ready());
    }
}
