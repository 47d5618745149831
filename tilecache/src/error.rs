//! Errors produced by tile and grid sources.
//!
//! A [`SourceError`] is what callers of a cached source see when a fetch fails.
//! It carries an optional HTTP-like status code, which decides whether the
//! failure may be cached (client errors, `400..=499`) or must always be retried
//! upstream (server errors, or errors without a status).
//!
//! Errors replayed from a negative cache entry keep only the status code and are
//! marked with [`SourceError::is_cached`]; the original message does not survive
//! the cache boundary.

use std::fmt;

use thiserror::Error;

use crate::source::OperationKind;

/// Error returned by a source operation, fresh or replayed from cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SourceError {
    message: String,
    status_code: Option<u16>,
    from_cache: bool,
}

impl SourceError {
    /// Creates an error without a status code. Never cached.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            from_cache: false,
        }
    }

    /// Creates an error carrying an HTTP-like status code.
    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
            from_cache: false,
        }
    }

    /// Shorthand for a `404` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(message, 404)
    }

    /// Synthetic error replayed from a negative cache entry.
    pub fn cached(status_code: u16) -> Self {
        Self {
            message: format!("cached upstream error (status {})", status_code),
            status_code: Some(status_code),
            from_cache: true,
        }
    }

    /// Error for an operation the wrapped source does not implement.
    pub fn unsupported(kind: OperationKind) -> Self {
        Self::new(format!("source does not implement {} requests", kind))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// True when this error was decoded from a negative cache entry.
    pub fn is_cached(&self) -> bool {
        self.from_cache
    }

    /// Client errors (`4xx`) are the only cacheable failures.
    pub fn is_cacheable(&self) -> bool {
        matches!(self.status_code, Some(400..=499))
    }
}

/// Display helper for optional status codes in log fields.
pub(crate) struct StatusField(pub Option<u16>);

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "{}", code),
            None => f.write_str("none"),
        }
    }
}
