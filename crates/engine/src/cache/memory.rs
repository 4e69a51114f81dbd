//! In-process cache backend with per-entry expiry.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::RwLock, time::Instant};

use super::{CacheError, CacheStore};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Map size from which `set` sweeps every expired entry.
const SWEEP_THRESHOLD: usize = 1024;

/// `HashMap`-backed [`CacheStore`]. Expired entries read as misses and are
/// purged on access; once the map holds `sweep_threshold` entries, each
/// `set` also drops every expired entry. Once closed, every call fails with
/// [`CacheError::Unavailable`].
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    closed: AtomicBool,
    sweep_threshold: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_sweep_threshold(SWEEP_THRESHOLD)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_sweep_threshold(sweep_threshold: usize) -> Self {
        Self {
            entries: RwLock::default(),
            closed: AtomicBool::new(false),
            sweep_threshold,
        }
    }

    /// Number of live (non-expired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Unavailable("memory cache closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.ensure_open()?;
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.len() >= self.sweep_threshold {
            let before = entries.len();
            entries.retain(|_, e| e.expires_at > now);
            tracing::debug!(swept = before - entries.len(), "expired cache entries swept");
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.entries.write().await.clear();
    }
}
