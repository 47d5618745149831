//! Cache settings loaded from an INI file.
//!
//! ```ini
//! [cache]
//! ttl = 300
//! stale = 0
//! memory_max_bytes = 268435456
//! ; 0 disables the bounded wrapper
//! high_water_mark = 0
//! ```
//!
//! Missing keys keep their defaults and unknown keys are ignored.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use ini::Ini;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::cache::{
    BoundedBackend, CacheBackend, CacheConfig, MemoryBackend, DEFAULT_STALE_SECS,
    DEFAULT_TTL_SECS,
};

/// Section holding cache settings.
const SECTION: &str = "cache";

/// Default memory backend capacity: 256 MiB.
pub const DEFAULT_MEMORY_MAX_BYTES: u64 = 256 * 1024 * 1024;

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Cache settings as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSettings {
    /// Time-to-live of fresh entries in seconds.
    pub ttl: u64,

    /// Stale-while-revalidate window in seconds.
    pub stale: u64,

    /// Capacity of the in-memory backend in bytes.
    pub memory_max_bytes: u64,

    /// Maximum outstanding backend reads; 0 leaves reads unbounded.
    pub high_water_mark: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL_SECS,
            stale: DEFAULT_STALE_SECS,
            memory_max_bytes: DEFAULT_MEMORY_MAX_BYTES,
            high_water_mark: 0,
        }
    }
}

impl CacheSettings {
    /// Load settings from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        let Some(section) = ini.section(Some(SECTION)) else {
            return Ok(settings);
        };

        if let Some(value) = section.get("ttl") {
            settings.ttl = parse_value("ttl", value)?;
        }
        if let Some(value) = section.get("stale") {
            settings.stale = parse_value("stale", value)?;
        }
        if let Some(value) = section.get("memory_max_bytes") {
            settings.memory_max_bytes = parse_value("memory_max_bytes", value)?;
        }
        if let Some(value) = section.get("high_water_mark") {
            settings.high_water_mark = parse_value("high_water_mark", value)?;
        }

        Ok(settings)
    }

    /// Build the backend these settings describe.
    ///
    /// A memory backend, wrapped in a [`BoundedBackend`] when a high-water mark
    /// is configured.
    pub fn build_backend(&self) -> Arc<dyn CacheBackend> {
        let memory = MemoryBackend::new(self.memory_max_bytes);
        if self.high_water_mark > 0 {
            info!(
                memory_max_bytes = self.memory_max_bytes,
                high_water_mark = self.high_water_mark,
                "Using bounded memory cache backend"
            );
            Arc::new(BoundedBackend::new(memory, self.high_water_mark))
        } else {
            info!(
                memory_max_bytes = self.memory_max_bytes,
                "Using memory cache backend"
            );
            Arc::new(memory)
        }
    }

    /// Cache config for `client` with these settings' TTL and stale window.
    pub fn cache_config(&self, client: Arc<dyn CacheBackend>) -> CacheConfig {
        CacheConfig::new(client)
            .with_ttl(self.ttl)
            .with_stale(self.stale)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: format!("{}.{}", SECTION, key),
            value: value.to_string(),
        })
}
