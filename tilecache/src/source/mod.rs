//! Tile source abstraction and its caching decorator.
//!
//! A source produces tiles and/or grids addressed by [`Coord`]. Sources that can
//! be opened from a URI ([`OpenSource`]) can be decorated with a cache:
//!
//! ```ignore
//! use tilecache::cache::{CacheConfig, MemoryBackend};
//! use tilecache::source::{decorate, Coord, TileSource};
//!
//! let backend = Arc::new(MemoryBackend::new(64 << 20));
//! let (config, factory) = decorate::<MySource>(CacheConfig::new(backend).with_ttl(60));
//! let source = factory.open("mysource://layer").await?;
//! let tile = source.get_tile(Coord::new(4, 8, 5)).await?;
//! ```

mod decorator;
mod types;

pub use decorator::{decorate, CachedSource, CachedSourceFactory};
pub use types::{Capabilities, Coord, OpenSource, OperationKind, TileSource};
