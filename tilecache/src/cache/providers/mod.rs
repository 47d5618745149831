//! Cache backend implementations.
//!
//! Each backend implements the `CacheBackend` trait and relies on its own native
//! per-key expiry; the caching layer never evicts entries itself.
//!
//! # Available Backends
//!
//! - [`MemoryBackend`]: In-process cache using moka, with per-entry TTL
//! - [`BoundedBackend`]: Wrapper rejecting reads above a high-water mark
//!
//! Network stores (Redis, memcached, ...) are implemented outside this crate
//! against the same trait, usually wrapped in a [`BoundedBackend`]:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilecache::cache::{BoundedBackend, CacheConfig};
//!
//! let backend = BoundedBackend::new(RedisBackend::connect(url).await?, 256);
//! let config = CacheConfig::new(Arc::new(backend)).with_ttl(600);
//! ```

mod bounded;
mod memory;

pub use bounded::BoundedBackend;
pub use memory::MemoryBackend;
