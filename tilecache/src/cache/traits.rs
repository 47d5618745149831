//! Backend contract for the caching layer.
//!
//! The `CacheBackend` trait is the narrow key-value interface every store must
//! offer: `get`, `set` with a per-key TTL, and an `error` sink for failures that
//! must never reach the caller.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable for debugging, namespaced by the caller
//! - **Vec<u8> values**: Opaque bytes produced by the wire codec
//! - **Native expiry**: The backend owns eviction; the caching layer only passes a TTL
//! - **Non-fatal failures**: Errors are reported to `error()` and treated as misses
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support
//!
//! # Backpressure
//!
//! A backend fronting a network store may refuse a `get` when too many requests
//! are outstanding, failing it immediately with [`BackendError::Backpressure`].
//! The caching layer handles that exactly like any other failed `get`: the
//! request goes to the live source and only that request loses caching.
//!
//! # Example
//!
//! ```ignore
//! use tilecache::cache::{CacheBackend, MemoryBackend};
//!
//! let backend = MemoryBackend::new(64 * 1024 * 1024);
//! backend.set("tile:abc:0:0:0", 300, vec![1, 2, 3]).await?;
//! let value = backend.get("tile:abc:0:0:0").await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::cache::codec::CodecError;
use crate::error::SourceError;

/// Errors reported by cache backends and routed to [`CacheBackend::error`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend refused the request because too many are outstanding.
    #[error("Backpressure: {outstanding} requests outstanding (high water mark: {high_water})")]
    Backpressure { outstanding: usize, high_water: usize },

    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Provider-specific error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A stored value could not be decoded.
    #[error("Corrupt entry at {key}: {source}")]
    CorruptEntry {
        key: String,
        #[source]
        source: CodecError,
    },

    /// A background refresh of a stale entry failed upstream.
    #[error("Refresh of {key} failed: {source}")]
    RefreshFailed {
        key: String,
        #[source]
        source: SourceError,
    },
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Key-value store used by the caching layer.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; one backend is shared by every
/// cached operation built from the same configuration, and by background
/// refresh tasks.
pub trait CacheBackend: Send + Sync {
    /// Retrieve a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(data))` if the key exists and has not expired
    /// - `Ok(None)` if the key is not found
    /// - `Err(_)` if the lookup failed (including backpressure rejections)
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, BackendError>>;

    /// Store a value that the backend expires after `ttl_secs` seconds.
    ///
    /// Best effort: failures are reported by the caller through [`error`](Self::error)
    /// and never fail a fetch.
    fn set(&self, key: &str, ttl_secs: u64, value: Vec<u8>)
        -> BoxFuture<'_, Result<(), BackendError>>;

    /// Sink for non-fatal failures. Must not panic or block.
    fn error(&self, err: &BackendError) {
        warn!(error = %err, "Cache backend error");
    }
}

impl<T: CacheBackend + ?Sized> CacheBackend for Arc<T> {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, BackendError>> {
        (**self).get(key)
    }

    fn set(
        &self,
        key: &str,
        ttl_secs: u64,
        value: Vec<u8>,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        (**self).set(key, ttl_secs, value)
    }

    fn error(&self, err: &BackendError) {
        (**self).error(err)
    }
}
