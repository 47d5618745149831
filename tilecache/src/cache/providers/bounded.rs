//! High-water mark wrapper for cache backends.
//!
//! Network stores queue requests when they fall behind. Waiting on a slow cache
//! is worse than not caching, so `BoundedBackend` caps the number of outstanding
//! `get` calls and rejects the excess immediately:
//!
//! ```text
//!   get ──► try_acquire ──┬── permit ──► inner.get ──► release
//!                         │
//!                         └── none ────► Err(Backpressure)
//!                                        (caller falls through to the source)
//! ```
//!
//! Writes are not bounded; their outcome never reaches the caller.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::trace;

use crate::cache::traits::{BackendError, BoxFuture, CacheBackend};

/// Backend wrapper rejecting reads above a high-water mark.
pub struct BoundedBackend<B> {
    inner: B,

    /// One permit per allowed outstanding `get`.
    permits: Arc<Semaphore>,

    high_water: usize,
}

impl<B: CacheBackend> BoundedBackend<B> {
    /// Wrap `inner`, allowing at most `high_water` concurrent reads.
    ///
    /// A high-water mark of zero rejects every read, which disables caching
    /// reads entirely while still accepting writes.
    pub fn new(inner: B, high_water: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(high_water)),
            high_water,
        }
    }

    /// Number of reads currently in flight.
    pub fn outstanding(&self) -> usize {
        self.high_water
            .saturating_sub(self.permits.available_permits())
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: CacheBackend> CacheBackend for BoundedBackend<B> {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, BackendError>> {
        let key = key.to_string();
        Box::pin(async move {
            let Ok(_permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                trace!(key = %key, high_water = self.high_water, "Rejecting cache read");
                return Err(BackendError::Backpressure {
                    outstanding: self.outstanding(),
                    high_water: self.high_water,
                });
            };
            self.inner.get(&key).await
        })
    }

    fn set(
        &self,
        key: &str,
        ttl_secs: u64,
        value: Vec<u8>,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        self.inner.set(key, ttl_secs, value)
    }

    fn error(&self, err: &BackendError) {
        self.inner.error(err)
    }
}
