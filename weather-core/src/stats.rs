//! Process-wide cache statistics.
//!
//! One [`CacheStats`] is constructed at startup and shared through an `Arc`
//! with the retrieval service and the cache facade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    started_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    /// Build a tracker with an explicit start instant.
    pub fn started_at(started_at: Instant) -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_at,
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Hit rate as a percentage with one decimal digit, e.g. `"66.7%"`.
    pub fn hit_rate(&self) -> String {
        format_hit_rate(self.hits(), self.misses())
    }

    /// Elapsed time since start as `"{hours}h {minutes}m"`.
    pub fn uptime(&self) -> String {
        format_uptime(self.started_at.elapsed())
    }
}

fn format_hit_rate(hits: u64, misses: u64) -> String {
    let total = hits + misses;
    if total == 0 {
        return "0.0%".to_string();
    }
    let rate = hits as f64 / total as f64 * 100.0;
    format!("{rate:.1}%")
}

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{hours}h {minutes}m")
}
