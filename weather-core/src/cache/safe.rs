use std::sync::Arc;
use tracing::{debug, warn};

use super::{CacheBackend, ConnectionSupervisor};
use crate::error::CacheResult;
use crate::stats::CacheStats;

/// Cache facade that never fails.
///
/// Every operation checks the supervisor first and absorbs backend errors,
/// returning a fallback value and counting one error in [`CacheStats`].
/// Data operations skipped while the backend is not ready count as errors too;
/// `size()` does not, so reading statistics never changes them.
///
/// - `get()` falls back to `None`
/// - `set()` / `delete()` fall back to `false`
/// - `size()` falls back to `0`
#[derive(Debug, Clone)]
pub struct SafeCache {
    backend: Arc<dyn CacheBackend>,
    supervisor: Arc<ConnectionSupervisor>,
    stats: Arc<CacheStats>,
}

impl SafeCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        supervisor: Arc<ConnectionSupervisor>,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self { backend, supervisor, stats }
    }

    pub fn is_ready(&self) -> bool {
        self.supervisor.is_ready()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if !self.admit("get", key) {
            return None;
        }
        self.absorb("get", key, self.backend.get(key).await).flatten()
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        if !self.admit("set", key) {
            return false;
        }
        let stored = self.absorb("set", key, self.backend.set(key, value, ttl_secs).await);
        if stored.is_some() {
            debug!(key, ttl_secs, "Cache SET");
        }
        stored.is_some()
    }

    pub async fn delete(&self, key: &str) -> bool {
        if !self.admit("delete", key) {
            return false;
        }
        self.absorb("delete", key, self.backend.delete(key).await).is_some()
    }

    pub async fn size(&self) -> u64 {
        if !self.supervisor.is_ready() {
            return 0;
        }
        self.absorb("size", "*", self.backend.size().await).unwrap_or(0)
    }

    pub async fn disconnect(&self) {
        self.backend.disconnect().await;
    }

    fn admit(&self, op: &'static str, key: &str) -> bool {
        if self.supervisor.is_ready() {
            return true;
        }
        self.stats.record_error();
        debug!(op, key, state = %self.supervisor.state(), "Cache not ready, skipping");
        false
    }

    fn absorb<T>(&self, op: &'static str, key: &str, result: CacheResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.stats.record_error();
                warn!(op, key, error = %err, backend = self.backend.name(), "Cache operation failed");
                None
            }
        }
    }
}
