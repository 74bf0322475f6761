//! Cache layer: backends with expiring entries, their connection supervision,
//! and the failure-absorbing facade the retrieval service talks to.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::CacheResult;

pub mod memory;
pub mod redis;
pub mod safe;
pub mod supervisor;

pub use memory::MemoryBackend;
pub use self::redis::RedisBackend;
pub use safe::SafeCache;
pub use supervisor::{ConnectionState, ConnectionSupervisor};

/// Lifetime of every cached weather payload.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// A key/value store with native key expiry.
///
/// Implementations report connection lifecycle events to the
/// [`ConnectionSupervisor`] they were built with.
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// Establish the connection. Failure leaves the supervisor disconnected.
    async fn connect(&self) -> CacheResult<()>;

    async fn disconnect(&self);

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Number of keys currently stored.
    async fn size(&self) -> CacheResult<u64>;

    fn name(&self) -> &'static str;
}
