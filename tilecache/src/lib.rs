//! tilecache - Caching decorator for tile and grid sources
//!
//! This library caches the output of async tile producers in a pluggable
//! key-value backend, with per-entry TTL, stale-while-revalidate and negative
//! caching of client errors.
//!
//! # Modules
//!
//! - [`cache`] - Entry codec, backend contract, bundled backends and the caching getter
//! - [`source`] - Source traits and the decorator that caches their operations
//! - [`config`] - INI-backed cache settings
//! - [`error`] - Errors returned by sources, fresh or replayed from cache

pub mod cache;
pub mod config;
pub mod error;
pub mod source;

pub use cache::{CacheBackend, CacheConfig, CachingGetter, Fetched, MemoryBackend};
pub use error::SourceError;
pub use source::{decorate, CachedSource, Coord, OpenSource, TileSource};
