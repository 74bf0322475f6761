//! Redis cache backend.
//!
//! Holds a single multiplexed connection. Connection-class failures are
//! reported to the supervisor and drop the connection until the next
//! [`connect`](CacheBackend::connect).

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::RedisError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CacheBackend, ConnectionSupervisor};
use crate::error::{CacheError, CacheResult};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RedisBackend {
    client: redis::Client,
    url: String,
    connect_timeout: Duration,
    connection: Mutex<Option<MultiplexedConnection>>,
    supervisor: Arc<ConnectionSupervisor>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("url", &redact_url(&self.url))
            .field("state", &self.supervisor.state())
            .finish()
    }
}

impl RedisBackend {
    /// Create a backend for `url`. No connection is made until `connect()`.
    pub fn open(url: &str, supervisor: Arc<ConnectionSupervisor>) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {e}"))
        })?;

        Ok(Self {
            client,
            url: url.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connection: Mutex::new(None),
            supervisor,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn connection(&self) -> CacheResult<MultiplexedConnection> {
        self.connection
            .lock()
            .clone()
            .ok_or_else(|| CacheError::Connection("Redis is not connected".to_string()))
    }

    fn command_failed(&self, command: &str, err: RedisError) -> CacheError {
        if is_connection_error(&err) {
            warn!(command, error = %err, "Redis connection lost");
            self.connection.lock().take();
            self.supervisor.connection_lost();
            CacheError::Connection(format!("Redis {command} failed: {err}"))
        } else {
            CacheError::Backend(format!("Redis {command} failed: {err}"))
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn connect(&self) -> CacheResult<()> {
        self.supervisor.connect_started();

        let attempt = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await;

        match attempt {
            Ok(Ok(conn)) => {
                *self.connection.lock() = Some(conn);
                self.supervisor.connect_succeeded();
                info!(url = %redact_url(&self.url), "Redis connected");
                Ok(())
            }
            Ok(Err(e)) => {
                self.supervisor.connect_failed();
                warn!(url = %redact_url(&self.url), error = %e, "Redis connect failed");
                Err(CacheError::Connection(format!("Failed to connect to Redis: {e}")))
            }
            Err(_) => {
                self.supervisor.connect_failed();
                warn!(
                    url = %redact_url(&self.url),
                    timeout = ?self.connect_timeout,
                    "Redis connect timed out"
                );
                Err(CacheError::Connection(format!(
                    "Timed out connecting to Redis after {:?}",
                    self.connect_timeout
                )))
            }
        }
    }

    async fn disconnect(&self) {
        self.connection.lock().take();
        self.supervisor.connection_lost();
        debug!("Redis connection dropped");
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection()?;
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| self.command_failed("GET", e))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.connection()?;
        // EX 0 is rejected by the server
        let ttl_secs = ttl_secs.max(1);

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| self.command_failed("SET", e))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection()?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| self.command_failed("DEL", e))
    }

    async fn size(&self) -> CacheResult<u64> {
        let mut conn = self.connection()?;
        redis::cmd("DBSIZE")
            .query_async::<u64>(&mut conn)
            .await
            .map_err(|e| self.command_failed("DBSIZE", e))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}

/// Redact the password of a Redis URL for logging.
pub(crate) fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // scheme separator, no password present
            if url[colon_pos..].starts_with("://") {
                return url.to_string();
            }
            return format!("{}***{}", &url[..=colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}
