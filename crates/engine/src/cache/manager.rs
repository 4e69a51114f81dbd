//! Read-through caching and invalidation of monthly aggregates.

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use super::CacheStore;
use crate::{CacheKind, MonthKey, ResultEngine, Scope};

/// Expiry applied to cached aggregates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtl {
    /// Monthly summaries.
    pub report: Duration,
    /// Budget alerts.
    pub alert: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            report: Duration::from_secs(15 * 60),
            alert: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Orchestrates read-through caching and invalidate-on-write for monthly
/// aggregates.
///
/// Backend failures never fail a call: reads fall through to the compute
/// function and writes are logged and dropped. Entries left stale by a failed
/// invalidation expire with their TTL.
#[derive(Clone)]
pub struct AggregateCache {
    store: Arc<dyn CacheStore>,
    ttl: CacheTtl,
}

impl AggregateCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: CacheTtl) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Returns the cached value under `key`, or runs `compute`, caches its
    /// result for `ttl` and returns it.
    ///
    /// On a hit `compute` is not invoked. Errors from `compute` are returned
    /// and nothing is cached.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> ResultEngine<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResultEngine<T>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(value);
                }
                Err(err) => tracing::warn!(key, "discarding unreadable cache entry: {err}"),
            },
            Ok(None) => tracing::debug!(key, "cache miss"),
            Err(err) => tracing::warn!(key, "cache read failed, computing directly: {err}"),
        }

        let value = compute().await?;
        self.set_and_cache(key, &value, ttl).await;
        Ok(value)
    }

    /// Overwrites `key` with `value`. Failures are logged, not returned.
    pub async fn set_and_cache<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, "failed to serialize cache entry: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(key, raw, ttl).await {
            tracing::warn!(key, "cache write failed: {err}");
        }
    }

    /// Drops the cached summary and alert of `(scope, month)`.
    ///
    /// Best effort: a failed delete is logged and the entry expires with its
    /// TTL.
    pub async fn invalidate(&self, scope: &Scope, month: MonthKey) {
        for kind in [CacheKind::Report, CacheKind::Alert] {
            let key = scope.cache_key(kind, month);
            match self.store.del(&key).await {
                Ok(()) => tracing::debug!(key = key.as_str(), "cache entry invalidated"),
                Err(err) => tracing::warn!(key = key.as_str(), "cache invalidation failed: {err}"),
            }
        }
    }
}
