//! Cache layer for derived monthly aggregates.
//!
//! The cache is an accelerator, never a source of truth: [`AggregateCache`]
//! falls back to the ledger whenever the [`CacheStore`] misbehaves.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use manager::{AggregateCache, CacheTtl};
pub use memory::MemoryCache;
pub use redis::RedisCache;

mod manager;
mod memory;
mod redis;

/// Errors raised by a cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Minimal key-value contract the aggregate cache relies on.
///
/// Values are opaque strings; deleting a missing key is not an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Releases the backend's resources at shutdown.
    async fn close(&self) {}
}
