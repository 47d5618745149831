//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Value};

use tilecache::cache::expiry::format_http_date;
use tilecache::cache::{
    BackendError, BoxFuture, CacheBackend, FetchResult, Fetched, Fetcher, MemoryBackend,
    SourceOptions,
};
use tilecache::source::{Capabilities, Coord, OpenSource, OperationKind, TileSource};
use tilecache::SourceError;

pub const LAST_MODIFIED: &str = "Sat, 01 Jan 2022 00:00:00 GMT";

// ============================================================================
// Backends
// ============================================================================

/// Memory backend that records everything sent to its error sink.
pub struct RecordingBackend {
    inner: MemoryBackend,
    errors: Mutex<Vec<String>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(16 * 1024 * 1024),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn has_error(&self, needle: &str) -> bool {
        self.errors().iter().any(|e| e.contains(needle))
    }
}

impl CacheBackend for RecordingBackend {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, BackendError>> {
        self.inner.get(key)
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
        self.errors.lock().unwrap().push(err.to_string());
    }
}

/// Backend that is permanently down.
#[derive(Default)]
pub struct FailingBackend {
    errors: Mutex<Vec<String>>,
}

impl FailingBackend {
    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl CacheBackend for FailingBackend {
    fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, BackendError>> {
        Box::pin(async { Err(BackendError::Unavailable("connection refused".to_string())) })
    }

    fn set(
        &self,
        _key: &str,
        _ttl_secs: u64,
        _value: Vec<u8>,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(async { Err(BackendError::Unavailable("connection refused".to_string())) })
    }

    fn error(&self, err: &BackendError) {
        self.errors.lock().unwrap().push(err.to_string());
    }
}

// ============================================================================
// Fetchers
// ============================================================================

pub type Stats = Arc<DashMap<String, usize>>;

pub fn calls(stats: &Stats, id: &str) -> usize {
    stats.get(id).map(|count| *count).unwrap_or(0)
}

/// Fetcher keyed by string ids with fixed behaviors:
///
/// - `"404"` fails with a cacheable not-found
/// - `"500"` fails with a server error
/// - `"nocode"` fails without a status
/// - `"expires"` returns an `Expires` header one second ahead
/// - anything else returns a JSON document naming the id
pub fn counting_fetcher(stats: Stats) -> impl Fetcher<String> {
    move |id: String| -> BoxFuture<'static, FetchResult> {
        *stats.entry(id.clone()).or_insert(0) += 1;
        Box::pin(async move {
            match id.as_str() {
                "404" => Err(SourceError::not_found("Not found")),
                "500" => Err(SourceError::with_status("Unexpected error", 500)),
                "nocode" => Err(SourceError::new("Unexpected error")),
                "expires" => {
                    let expires = Utc::now() + chrono::Duration::milliseconds(1000);
                    Ok(Fetched::new(b"expiring".to_vec())
                        .with_header("Expires", format_http_date(expires)))
                }
                _ => Ok(Fetched::new(json!({ "id": id }))),
            }
        })
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Source with tiles and/or grids depending on its URI:
///
/// - `test://tiles` - tiles only
/// - `test://grids` - grids only
/// - `test://all` (or anything else under `test://`) - both
///
/// Zoom 4 is missing (404) and zoom 2 is broken (500).
pub struct TestSource {
    uri: String,
    options: SourceOptions,
    capabilities: Capabilities,
    calls: DashMap<String, usize>,
}

impl TestSource {
    pub fn new(uri: &str, options: SourceOptions) -> Self {
        let capabilities = match uri {
            "test://tiles" => Capabilities::tiles(),
            "test://grids" => Capabilities::grids(),
            _ => Capabilities::all(),
        };
        Self {
            uri: uri.to_string(),
            options,
            capabilities,
            calls: DashMap::new(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Number of upstream calls of `kind` at `coord`.
    pub fn calls(&self, kind: OperationKind, coord: Coord) -> usize {
        self.calls
            .get(&format!("{}:{}", kind, coord))
            .map(|count| *count)
            .unwrap_or(0)
    }

    fn record(&self, kind: OperationKind, coord: Coord) {
        *self.calls.entry(format!("{}:{}", kind, coord)).or_insert(0) += 1;
    }

    fn failure(kind: OperationKind, coord: Coord) -> Option<SourceError> {
        match coord.z {
            4 => Some(SourceError::not_found(match kind {
                OperationKind::Tile => "Tile does not exist",
                OperationKind::Grid => "Grid does not exist",
            })),
            2 => Some(SourceError::with_status("Unexpected error", 500)),
            _ => None,
        }
    }
}

pub fn tile_body(coord: Coord) -> Vec<u8> {
    format!("tile {}", coord).into_bytes()
}

pub fn grid_body(coord: Coord) -> Value {
    json!({ "grid": [format!("{}", coord)], "keys": ["", "1"], "data": { "1": { "name": "test" } } })
}

impl TileSource for TestSource {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn get_tile(&self, coord: Coord) -> BoxFuture<'_, FetchResult> {
        if !self.capabilities.tile {
            return Box::pin(async { Err(SourceError::unsupported(OperationKind::Tile)) });
        }
        self.record(OperationKind::Tile, coord);
        Box::pin(async move {
            if let Some(err) = Self::failure(OperationKind::Tile, coord) {
                return Err(err);
            }
            Ok(Fetched::new(tile_body(coord))
                .with_header("Content-Type", "image/png")
                .with_header("Last-Modified", LAST_MODIFIED))
        })
    }

    fn get_grid(&self, coord: Coord) -> BoxFuture<'_, FetchResult> {
        if !self.capabilities.grid {
            return Box::pin(async { Err(SourceError::unsupported(OperationKind::Grid)) });
        }
        self.record(OperationKind::Grid, coord);
        Box::pin(async move {
            if let Some(err) = Self::failure(OperationKind::Grid, coord) {
                return Err(err);
            }
            Ok(Fetched::new(grid_body(coord))
                .with_header("Content-Type", "application/json")
                .with_header("Last-Modified", LAST_MODIFIED))
        })
    }
}

impl OpenSource for TestSource {
    fn open<'a>(
        uri: &'a str,
        options: &'a SourceOptions,
    ) -> BoxFuture<'a, Result<Self, SourceError>> {
        Box::pin(async move {
            if !uri.starts_with("test://") {
                return Err(SourceError::new(format!("Unsupported uri: {}", uri)));
            }
            Ok(TestSource::new(uri, options.clone()))
        })
    }
}
