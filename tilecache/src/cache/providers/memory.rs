//! In-memory cache backend using moka.
//!
//! This backend wraps `moka::future::Cache` to provide an async-safe,
//! lock-free in-memory store with per-entry expiry.
//!
//! # Why moka?
//!
//! - Lock-free reads (common case)
//! - Concurrent writes without blocking
//! - Per-entry expiry through the `Expiry` policy, matching the TTL passed to `set`
//! - Memory-bounded with configurable limits
//! - Designed for async contexts
//!
//! # Expiry
//!
//! Each `set` carries its own TTL. The expiry policy reads it back from the
//! stored value on insert and on overwrite, so a background refresh that writes
//! the same key again restarts its lifetime. A TTL of zero expires immediately.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache as MokaCache;
use moka::Expiry;

use crate::cache::traits::{BackendError, BoxFuture, CacheBackend};

/// A stored value together with the TTL it was written with.
#[derive(Clone)]
struct StoredValue {
    data: Arc<Vec<u8>>,
    ttl: Duration,
}

/// Expiry policy reading the TTL from each stored value.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache backend.
///
/// Entries are weighted by key plus value size and evicted (LRU) when the
/// configured capacity is exceeded, independently of their TTL.
pub struct MemoryBackend {
    /// The underlying moka cache.
    cache: MokaCache<String, StoredValue>,

    /// Maximum size in bytes.
    max_size_bytes: u64,
}

impl MemoryBackend {
    /// Create a new memory backend.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Maximum total size of keys and values in bytes
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // Weight each entry by its key and data size
            .weigher(|key: &String, value: &StoredValue| -> u32 {
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                (key.len() + value.data.len()).min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            max_size_bytes,
        }
    }

    /// Get the current size of the backend in bytes.
    ///
    /// moka updates this lazily; call [`run_pending_tasks`](Self::run_pending_tasks)
    /// first for an exact figure.
    pub fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Get the current number of entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Get the maximum configured size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Run pending maintenance (expiry, eviction, stats).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, BackendError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .cache
                .get(&key)
                .await
                .map(|value| (*value.data).clone()))
        })
    }

    fn set(
        &self,
        key: &str,
        ttl_secs: u64,
        value: Vec<u8>,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        let key = key.to_string();
        Box::pin(async move {
            let value = StoredValue {
                data: Arc::new(value),
                ttl: Duration::from_secs(ttl_secs),
            };
            self.cache.insert(key, value).await;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_new() {
        let backend = MemoryBackend::new(1_000_000);
        assert_eq!(backend.max_size_bytes(), 1_000_000);
        assert_eq!(backend.entry_count(), 0);
        assert_eq!(backend.size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_memory_backend_set_and_get() {
        let backend = MemoryBackend::new(1_000_000);

        backend.set("key1", 60, vec![1, 2, 3]).await.unwrap();

        let value = backend.get("key1").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_memory_backend_get_missing() {
        let backend = MemoryBackend::new(1_000_000);

        let value = backend.get("nonexistent").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_memory_backend_replace_existing() {
        let backend = MemoryBackend::new(1_000_000);

        backend.set("key1", 60, vec![1, 2, 3]).await.unwrap();
        backend.set("key1", 60, vec![4, 5, 6, 7]).await.unwrap();
        backend.run_pending_tasks().await;

        let value = backend.get("key1").await.unwrap();
        assert_eq!(value, Some(vec![4, 5, 6, 7]));
        assert_eq!(backend.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_backend_per_entry_ttl() {
        let backend = MemoryBackend::new(1_000_000);

        backend.set("short", 1, vec![1]).await.unwrap();
        backend.set("long", 60, vec![2]).await.unwrap();

        assert!(backend.get("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        backend.run_pending_tasks().await;

        assert!(backend.get("short").await.unwrap().is_none());
        assert_eq!(backend.get("long").await.unwrap(), Some(vec![2]));
    }

    #[tokio::test]
    async fn test_memory_backend_zero_ttl_expires_immediately() {
        let backend = MemoryBackend::new(1_000_000);

        backend.set("key1", 0, vec![1, 2, 3]).await.unwrap();

        assert!(backend.get("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_backend_overwrite_restarts_ttl() {
        let backend = MemoryBackend::new(1_000_000);

        backend.set("key1", 1, vec![1]).await.unwrap();
        backend.set("key1", 60, vec![2]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(backend.get("key1").await.unwrap(), Some(vec![2]));
    }

    #[tokio::test]
    async fn test_memory_backend_lru_eviction() {
        // Backend that can hold about 2.5 entries of 1000 bytes each
        let backend = MemoryBackend::new(2500);

        backend.set("key1", 60, vec![0u8; 1000]).await.unwrap();
        backend.set("key2", 60, vec![0u8; 1000]).await.unwrap();
        backend.set("key3", 60, vec![0u8; 1000]).await.unwrap();

        backend.run_pending_tasks().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        backend.run_pending_tasks().await;

        assert!(
            backend.size_bytes() <= 2500,
            "Expected size <= 2500, got {}",
            backend.size_bytes()
        );
    }

    #[tokio::test]
    async fn test_memory_backend_concurrent_access() {
        let backend = Arc::new(MemoryBackend::new(10_000_000));
        let mut handles = Vec::new();

        for i in 0..50 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                let key = format!("key{}", i);
                let data = vec![i as u8; 100];

                backend.set(&key, 60, data.clone()).await.unwrap();
                let result = backend.get(&key).await.unwrap();
                assert_eq!(result, Some(data));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        // moka is eventually consistent for stats
        backend.run_pending_tasks().await;
        assert_eq!(backend.entry_count(), 50);
    }
}
