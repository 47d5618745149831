//! Fetch-through cache with TTL, stale-while-revalidate and negative caching.
//!
//! A [`CachingGetter`] wraps any async fetch function keyed by an id. Each call:
//!
//! ```text
//! get(id)
//!   │
//!   ├─ backend.get(key) ── error ───────────────► error sink, fall through
//!   │        │
//!   │        ├─ negative entry ─────────────────► Err(cached error)
//!   │        ├─ positive entry, fresh ──────────► Ok(hit)
//!   │        ├─ positive entry, stale ──────────► Ok(hit) + background refresh
//!   │        ├─ positive entry, past window ────► fall through
//!   │        ├─ corrupt entry ──────────────────► error sink, fall through
//!   │        └─ absent ─────────────────────────► fall through
//!   │
//!   └─ fetcher(id) ─► encode ─► backend.set ─► response
//! ```
//!
//! The write on a miss is applied before the response is handed back, so the
//! next call for the same key sees it on any runtime flavor. Its outcome never
//! reaches the caller: failures go to the backend's error sink. Refreshes of
//! stale entries run detached.
//!
//! The cache is correctness-transparent: with the backend fully down, callers
//! see the same data and errors as the uncached fetcher, without `x-tl-cache`.

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::cache::codec::{
    self, Decoded, Entry, Headers, Payload, CACHE_HIT, HEADER_CACHE, HEADER_EXPIRES, HEADER_JSON,
};
use crate::cache::config::CacheConfig;
use crate::cache::expiry::{
    expires_after, format_http_date, freshness, parse_http_date, secs_until, Freshness,
};
use crate::cache::traits::{BackendError, BoxFuture, CacheBackend};
use crate::error::{SourceError, StatusField};

/// Upstream header carrying an absolute expiry (compared lowercase).
const UPSTREAM_EXPIRES: &str = "expires";

/// A successful fetch: payload plus response headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub payload: Payload,
    pub headers: Headers,
}

impl Fetched {
    /// Create a response without headers.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            headers: Headers::new(),
        }
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// True when this response was served from cache.
    pub fn is_cache_hit(&self) -> bool {
        self.header(HEADER_CACHE).and_then(Value::as_str) == Some(CACHE_HIT)
    }
}

/// Result of a fetch, cached or not.
pub type FetchResult = Result<Fetched, SourceError>;

/// Uncached fetch operation wrapped by a [`CachingGetter`].
///
/// Implemented for any `Fn(I) -> BoxFuture<'static, FetchResult>` closure.
pub trait Fetcher<I>: Send + Sync + 'static {
    fn fetch(&self, id: I) -> BoxFuture<'static, FetchResult>;
}

impl<I, F> Fetcher<I> for F
where
    F: Fn(I) -> BoxFuture<'static, FetchResult> + Send + Sync + 'static,
{
    fn fetch(&self, id: I) -> BoxFuture<'static, FetchResult> {
        self(id)
    }
}

/// Value to write once a live fetch completes.
struct PendingWrite {
    ttl_secs: u64,
    value: Vec<u8>,
}

struct Shared<I> {
    namespace: String,
    config: Arc<CacheConfig>,
    fetcher: Box<dyn Fetcher<I>>,

    /// Keys with a background refresh in flight.
    refreshing: DashSet<String>,
}

/// Cache-aside wrapper around a fetch function.
///
/// Cloning is cheap; clones share the namespace, config, fetcher and the set of
/// in-flight refreshes.
pub struct CachingGetter<I> {
    shared: Arc<Shared<I>>,
}

impl<I> Clone for CachingGetter<I> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<I> CachingGetter<I>
where
    I: Display + Send + 'static,
{
    /// Wrap `fetcher` with caching.
    ///
    /// # Arguments
    ///
    /// * `namespace` - Key prefix separating this operation from others sharing the backend
    /// * `config` - Backend, TTL and stale window
    /// * `fetcher` - The uncached fetch
    pub fn new(
        namespace: impl Into<String>,
        config: Arc<CacheConfig>,
        fetcher: impl Fetcher<I>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                namespace: namespace.into(),
                config,
                fetcher: Box::new(fetcher),
                refreshing: DashSet::new(),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.shared.namespace
    }

    pub fn config(&self) -> &Arc<CacheConfig> {
        &self.shared.config
    }

    /// Backend key for `id`.
    pub fn key(&self, id: &I) -> String {
        format!("{}:{}", self.shared.namespace, id)
    }

    /// Fetch `id`, through the cache.
    ///
    /// Backend failures never surface here; only upstream errors (fresh or
    /// replayed from a negative entry) do.
    pub async fn get(&self, id: I) -> FetchResult {
        let key = self.key(&id);
        let client = self.shared.config.client();

        match client.get(&key).await {
            Ok(Some(value)) => match codec::decode(&value) {
                Ok(Decoded::Negative(err)) => {
                    debug!(key = %key, status = %StatusField(err.status_code()), "Negative cache hit");
                    return Err(err);
                }
                Ok(Decoded::Positive(entry)) => {
                    let expires_at = entry
                        .headers
                        .get(HEADER_EXPIRES)
                        .and_then(Value::as_str)
                        .and_then(parse_http_date);

                    match freshness(expires_at, Utc::now(), self.shared.config.stale()) {
                        Freshness::Fresh => {
                            trace!(key = %key, "Cache hit");
                            return Ok(cache_hit(entry));
                        }
                        Freshness::Stale => {
                            debug!(key = %key, "Stale cache hit");
                            self.spawn_refresh(key, id);
                            return Ok(cache_hit(entry));
                        }
                        Freshness::Expired => {
                            debug!(key = %key, "Cached entry past stale window");
                        }
                    }
                }
                Err(source) => client.error(&BackendError::CorruptEntry {
                    key: key.clone(),
                    source,
                }),
            },
            Ok(None) => trace!(key = %key, "Cache miss"),
            Err(err) => client.error(&err),
        }

        let (result, write) = self.fetch_live(&key, id).await;
        if let Some(write) = write {
            store(client.as_ref(), &key, write).await;
        }
        result
    }

    /// Call the fetcher and prepare the entry to store for its outcome.
    async fn fetch_live(&self, key: &str, id: I) -> (FetchResult, Option<PendingWrite>) {
        match self.shared.fetcher.fetch(id).await {
            Err(err) => {
                let write = codec::encode_error(&err).map(|value| PendingWrite {
                    ttl_secs: self.shared.config.ttl(),
                    value,
                });
                if write.is_none() {
                    debug!(key = %key, error = %err, "Upstream error not cacheable");
                }
                (Err(err), write)
            }
            Ok(fetched) => {
                let (headers, ttl_secs) =
                    self.response_headers(fetched.headers, &fetched.payload, Utc::now());

                match codec::encode(&fetched.payload, &headers) {
                    Ok(value) => {
                        let response = Fetched {
                            payload: fetched.payload,
                            headers,
                        };
                        (Ok(response), Some(PendingWrite { ttl_secs, value }))
                    }
                    Err(e) => {
                        error!(key = %key, error = %e, "Failed to encode cache entry");
                        let err = SourceError::new(format!("Failed to encode cache entry: {}", e));
                        (Err(err), None)
                    }
                }
            }
        }
    }

    /// Build the headers of a live response and the backend TTL of its entry.
    ///
    /// An upstream `Expires` is kept verbatim and bounds the backend TTL;
    /// otherwise the entry expires after the configured TTL and the backend
    /// keeps it for the stale window as well.
    fn response_headers(
        &self,
        upstream: Headers,
        payload: &Payload,
        now: DateTime<Utc>,
    ) -> (Headers, u64) {
        let mut headers = Headers::new();
        for (name, value) in upstream {
            let name = name.to_ascii_lowercase();
            // Only the layer serving from cache may set this.
            if name != HEADER_CACHE {
                headers.insert(name, value);
            }
        }

        let ttl_secs = match headers.get(UPSTREAM_EXPIRES).cloned() {
            Some(expires) => {
                let ttl_secs = expires
                    .as_str()
                    .and_then(parse_http_date)
                    .map_or(0, |expires_at| secs_until(expires_at, now));
                headers.insert(HEADER_EXPIRES.to_string(), expires);
                ttl_secs
            }
            None => {
                let expires_at = expires_after(now, self.shared.config.ttl());
                headers.insert(
                    HEADER_EXPIRES.to_string(),
                    Value::String(format_http_date(expires_at)),
                );
                self.shared.config.backend_ttl()
            }
        };

        if payload.is_bytes() {
            headers.remove(HEADER_JSON);
        } else {
            headers.insert(HEADER_JSON.to_string(), Value::Bool(true));
        }

        (headers, ttl_secs)
    }

    /// Refresh a stale entry in the background. At most one refresh per key.
    ///
    /// The refresh runs in its own task so that a panicking fetcher is
    /// reported like any other failed refresh and the key is released for the
    /// next stale hit.
    fn spawn_refresh(&self, key: String, id: I) {
        if !self.shared.refreshing.insert(key.clone()) {
            trace!(key = %key, "Refresh already in flight");
            return;
        }

        let getter = self.clone();
        tokio::spawn(async move {
            let task = {
                let getter = getter.clone();
                let key = key.clone();
                tokio::spawn(async move { getter.refresh(&key, id).await })
            };

            let client = getter.shared.config.client();
            match task.await {
                Ok(Ok(())) => debug!(key = %key, "Refreshed stale entry"),
                Ok(Err(source)) => client.error(&BackendError::RefreshFailed {
                    key: key.clone(),
                    source,
                }),
                Err(join_err) => client.error(&BackendError::RefreshFailed {
                    key: key.clone(),
                    source: SourceError::new(format!("Refresh task failed: {}", join_err)),
                }),
            }
            getter.shared.refreshing.remove(&key);
        });
    }

    async fn refresh(&self, key: &str, id: I) -> Result<(), SourceError> {
        let (result, write) = self.fetch_live(key, id).await;
        if let Some(write) = write {
            store(self.shared.config.client().as_ref(), key, write).await;
        }
        result.map(|_| ())
    }
}

async fn store(client: &dyn CacheBackend, key: &str, write: PendingWrite) {
    if let Err(err) = client.set(key, write.ttl_secs, write.value).await {
        client.error(&err);
    }
}

fn cache_hit(entry: Entry) -> Fetched {
    let mut headers = entry.headers;
    headers.insert(HEADER_CACHE.to_string(), Value::String(CACHE_HIT.to_string()));
    Fetched {
        payload: entry.payload,
        headers,
    }
}
