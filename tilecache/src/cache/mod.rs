//! Caching layer for tile and grid sources.
//!
//! This module provides the storage contract, the entry wire format and the
//! fetch-through getter that together cache the output of an async producer.
//!
//! # Layout
//!
//! - [`codec`] - Byte layout of positive and negative entries
//! - [`expiry`] - HTTP-date handling and freshness evaluation
//! - [`traits`] - The [`CacheBackend`] contract every store implements
//! - [`providers`] - Bundled backends ([`MemoryBackend`], [`BoundedBackend`])
//! - [`getter`] - [`CachingGetter`], the TTL / stale-while-revalidate wrapper
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilecache::cache::{CacheConfig, CachingGetter, MemoryBackend};
//!
//! let config = Arc::new(CacheConfig::new(Arc::new(MemoryBackend::new(64 << 20))).with_ttl(60));
//! let getter = CachingGetter::new("thing", config, fetch_thing);
//! let fetched = getter.get(id).await?;
//! ```

pub mod codec;
mod config;
pub mod expiry;
mod getter;
pub mod providers;
pub mod traits;

pub use codec::{CodecError, Decoded, Entry, Headers, Payload};
pub use config::{CacheConfig, SourceOptions, DEFAULT_STALE_SECS, DEFAULT_TTL_SECS};
pub use expiry::Freshness;
pub use getter::{CachingGetter, FetchResult, Fetched, Fetcher};
pub use providers::{BoundedBackend, MemoryBackend};
pub use traits::{BackendError, BoxFuture, CacheBackend};
