use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::{CacheBackend, ConnectionSupervisor};
use crate::error::{CacheError, CacheResult};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process backend. Entries expire lazily on read and in [`size`](CacheBackend::size).
///
/// `set_available(false)` simulates the store going away.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
    supervisor: Arc<ConnectionSupervisor>,
}

impl MemoryBackend {
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            supervisor,
        }
    }

    /// Toggle availability. Going unavailable is reported to the supervisor at once.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if !available {
            self.supervisor.connection_lost();
        }
    }

    fn ensure_available(&self) -> CacheResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            self.supervisor.connection_lost();
            Err(CacheError::Connection("memory store unavailable".to_string()))
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn connect(&self) -> CacheResult<()> {
        self.supervisor.connect_started();
        match self.ensure_available() {
            Ok(()) => {
                self.supervisor.connect_succeeded();
                Ok(())
            }
            Err(err) => {
                self.supervisor.connect_failed();
                Err(err)
            }
        }
    }

    async fn disconnect(&self) {
        self.supervisor.connection_lost();
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        self.ensure_available()?;
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries.lock().insert(
            key.to_string(),
            Entry { value: value.to_string(), expires_at },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.ensure_available()?;
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn size(&self) -> CacheResult<u64> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries.len() as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
