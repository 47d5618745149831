//! Caching decorator for tile sources.
//!
//! [`decorate`] resolves a [`CacheConfig`] once and returns it together with a
//! factory. Every source the factory opens is wrapped in a [`CachedSource`],
//! which routes each supported operation through its own [`CachingGetter`]:
//!
//! ```text
//! CachedSource::get_tile(z/x/y)
//!   key = "tile:" + sha256(uri)[..16] + ":z:x:y"
//!   └─► CachingGetter ──miss──► inner.get_tile(z/x/y)
//!
//! CachedSource::get_grid(z/x/y)
//!   key = "grid:" + sha256(uri)[..16] + ":z:x:y"
//!   └─► CachingGetter ──miss──► inner.get_grid(z/x/y)
//! ```
//!
//! A cached source is itself a [`TileSource`], so decorators stack.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::{BoxFuture, CacheConfig, CachingGetter, FetchResult};
use crate::error::SourceError;
use crate::source::types::{Capabilities, Coord, OpenSource, OperationKind, TileSource};

/// Number of hex characters of the identity hash kept in keys.
const DIGEST_LEN: usize = 16;

/// Resolve `config` and build a factory of cached sources of type `S`.
///
/// The returned config is the same instance every source opened by the factory
/// shares; tests use it to reach the backend directly.
pub fn decorate<S: OpenSource>(config: CacheConfig) -> (Arc<CacheConfig>, CachedSourceFactory<S>) {
    let config = Arc::new(config);
    let factory = CachedSourceFactory {
        config: Arc::clone(&config),
        _source: PhantomData,
    };
    (config, factory)
}

/// Opens sources of type `S` wrapped with caching.
pub struct CachedSourceFactory<S> {
    config: Arc<CacheConfig>,
    _source: PhantomData<fn() -> S>,
}

impl<S> Clone for CachedSourceFactory<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            _source: PhantomData,
        }
    }
}

impl<S: OpenSource> CachedSourceFactory<S> {
    pub fn config(&self) -> &Arc<CacheConfig> {
        &self.config
    }

    /// Open the source at `uri` and wrap it.
    ///
    /// The config's source options are passed to [`OpenSource::open`] unmodified.
    pub async fn open(&self, uri: &str) -> Result<CachedSource<S>, SourceError> {
        let source = S::open(uri, self.config.source_options()).await?;
        Ok(CachedSource::new(source, uri, Arc::clone(&self.config)))
    }
}

/// Key id of one coordinate of one source.
#[derive(Debug, Clone)]
struct SourceKey {
    digest: Arc<str>,
    coord: Coord,
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.digest, self.coord.z, self.coord.x, self.coord.y
        )
    }
}

/// A tile source with cached operations.
pub struct CachedSource<S> {
    inner: Arc<S>,
    identity: String,
    digest: Arc<str>,
    tile: Option<CachingGetter<SourceKey>>,
    grid: Option<CachingGetter<SourceKey>>,
}

impl<S: TileSource> CachedSource<S> {
    /// Wrap an already constructed source.
    ///
    /// # Arguments
    ///
    /// * `source` - The producer to cache
    /// * `identity` - Stable identity of this instance, usually its URI
    /// * `config` - Backend, TTL and stale window
    pub fn new(source: S, identity: impl Into<String>, config: Arc<CacheConfig>) -> Self {
        let identity = identity.into();
        let digest = identity_digest(&identity);
        let inner = Arc::new(source);
        let capabilities = inner.capabilities();

        let tile = capabilities.tile.then(|| {
            let source = Arc::clone(&inner);
            CachingGetter::new(
                OperationKind::Tile.namespace(),
                Arc::clone(&config),
                move |key: SourceKey| -> BoxFuture<'static, FetchResult> {
                    let source = Arc::clone(&source);
                    Box::pin(async move { source.get_tile(key.coord).await })
                },
            )
        });

        let grid = capabilities.grid.then(|| {
            let source = Arc::clone(&inner);
            CachingGetter::new(
                OperationKind::Grid.namespace(),
                Arc::clone(&config),
                move |key: SourceKey| -> BoxFuture<'static, FetchResult> {
                    let source = Arc::clone(&source);
                    Box::pin(async move { source.get_grid(key.coord).await })
                },
            )
        });

        debug!(
            identity = %identity,
            digest = %digest,
            tile = capabilities.tile,
            grid = capabilities.grid,
            "Wrapped source with cache"
        );

        Self {
            inner,
            identity,
            digest,
            tile,
            grid,
        }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Backend key of `coord` for operation `kind`.
    pub fn cache_key(&self, kind: OperationKind, coord: Coord) -> String {
        let id = SourceKey {
            digest: Arc::clone(&self.digest),
            coord,
        };
        format!("{}:{}", kind.namespace(), id)
    }

    fn cached<'a>(
        &'a self,
        kind: OperationKind,
        getter: Option<&'a CachingGetter<SourceKey>>,
        coord: Coord,
    ) -> BoxFuture<'a, FetchResult> {
        let Some(getter) = getter else {
            return Box::pin(async move { Err(SourceError::unsupported(kind)) });
        };
        let key = SourceKey {
            digest: Arc::clone(&self.digest),
            coord,
        };
        Box::pin(getter.get(key))
    }
}

impl<S: TileSource> TileSource for CachedSource<S> {
    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn get_tile(&self, coord: Coord) -> BoxFuture<'_, FetchResult> {
        self.cached(OperationKind::Tile, self.tile.as_ref(), coord)
    }

    fn get_grid(&self, coord: Coord) -> BoxFuture<'_, FetchResult> {
        self.cached(OperationKind::Grid, self.grid.as_ref(), coord)
    }
}

/// Short lowercase hex digest of a source identity.
fn identity_digest(identity: &str) -> Arc<str> {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    Arc::from(&hex[..DIGEST_LEN])
}
