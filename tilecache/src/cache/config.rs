//! Per-decorator cache configuration.
//!
//! A `CacheConfig` is resolved once when a source type is decorated and then
//! shared (behind an `Arc`) by every cached operation built from it, including
//! background refresh tasks. It is never mutated after construction.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::traits::CacheBackend;

/// Default time-to-live of fresh entries (in seconds).
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default stale-while-revalidate window (in seconds). Zero disables it.
pub const DEFAULT_STALE_SECS: u64 = 0;

/// Options passed through unmodified to the wrapped source at construction.
pub type SourceOptions = Map<String, Value>;

/// Cache configuration: backend handle, TTL and stale window.
#[derive(Clone)]
pub struct CacheConfig {
    client: Arc<dyn CacheBackend>,
    ttl: u64,
    stale: u64,
    source_options: SourceOptions,
}

impl CacheConfig {
    /// Create a config with default TTL and stale window.
    ///
    /// # Arguments
    ///
    /// * `client` - The backend every cached operation reads and writes
    pub fn new(client: Arc<dyn CacheBackend>) -> Self {
        Self {
            client,
            ttl: DEFAULT_TTL_SECS,
            stale: DEFAULT_STALE_SECS,
            source_options: SourceOptions::new(),
        }
    }

    /// Set the time-to-live of fresh entries.
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl = ttl_secs;
        self
    }

    /// Set how long past expiry an entry may still be served while refreshing.
    pub fn with_stale(mut self, stale_secs: u64) -> Self {
        self.stale = stale_secs;
        self
    }

    /// Add an option forwarded to the source when it is opened.
    pub fn with_source_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.source_options.insert(name.into(), value.into());
        self
    }

    /// The backend handle.
    pub fn client(&self) -> &Arc<dyn CacheBackend> {
        &self.client
    }

    /// Time-to-live of fresh entries in seconds.
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Stale window in seconds.
    pub fn stale(&self) -> u64 {
        self.stale
    }

    /// Backend TTL for entries without an upstream expiry: long enough to
    /// outlive the stale window.
    pub fn backend_ttl(&self) -> u64 {
        self.ttl.saturating_add(self.stale)
    }

    pub fn source_options(&self) -> &SourceOptions {
        &self.source_options
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("ttl", &self.ttl)
            .field("stale", &self.stale)
            .field("source_options", &self.source_options)
            .finish_non_exhaustive()
    }
}
