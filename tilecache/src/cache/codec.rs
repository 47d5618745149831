//! Wire format for stored cache entries.
//!
//! Every entry is a single byte buffer so that any key-value backend can hold it.
//! Two shapes exist:
//!
//! ```text
//! Negative entry:   "404"
//!
//! Positive entry:   ┌──────────────────────────────────────┬──────────────┐
//!                   │ {"content-type":"image/png",...}     │ body bytes   │
//!                   │ JSON header object, space padded     │ (any length) │
//!                   │ to exactly 1024 bytes                │              │
//!                   └──────────────────────────────────────┴──────────────┘
//! ```
//!
//! The layout is shared by every process using the same backend, so it must not
//! change without changing the key namespace as well.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::SourceError;

/// Size of the fixed header block at the start of a positive entry.
pub const HEADER_BLOCK_SIZE: usize = 1024;

/// Absolute expiry of an entry, as an HTTP-date.
pub const HEADER_EXPIRES: &str = "x-tl-expires";

/// Set to `true` when the body is a JSON serialization of a non-binary payload.
pub const HEADER_JSON: &str = "x-tl-json";

/// Set to [`CACHE_HIT`] on responses served from cache.
pub const HEADER_CACHE: &str = "x-tl-cache";

/// Value of [`HEADER_CACHE`] on cache hits.
pub const CACHE_HIT: &str = "hit";

/// Response/entry headers. Insertion ordered so encoding is deterministic.
pub type Headers = Map<String, Value>;

/// Body of a source response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opaque bytes, stored verbatim (e.g. PNG tiles).
    Bytes(Vec<u8>),
    /// Text, stored as a JSON string.
    Text(String),
    /// Structured data, stored as JSON (e.g. UTF-grids).
    Json(Value),
}

impl Payload {
    /// True for payloads stored without JSON re-encoding.
    pub fn is_bytes(&self) -> bool {
        matches!(self, Payload::Bytes(_))
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(data) => Some(data),
            _ => None,
        }
    }

    /// Short name used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::Json(_) => "json",
        }
    }

    fn to_body(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Payload::Bytes(data) => Ok(data.clone()),
            Payload::Text(text) => serde_json::to_vec(text).map_err(CodecError::Serialize),
            Payload::Json(value) => serde_json::to_vec(value).map_err(CodecError::Serialize),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::Bytes(data)
    }
}

impl From<&[u8]> for Payload {
    fn from(data: &[u8]) -> Self {
        Payload::Bytes(data.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// A decoded positive entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub headers: Headers,
    pub payload: Payload,
}

/// Result of decoding a stored entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Negative entry, replayed as a synthetic error.
    Negative(SourceError),
    /// Positive entry.
    Positive(Entry),
}

/// Errors raised while encoding or decoding entries.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Headers do not fit in the fixed header block.
    #[error("Headers too large: {size} bytes (max: {max})")]
    HeadersTooLarge { size: usize, max: usize },

    /// JSON serialization failed.
    #[error("Failed to serialize entry: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Buffer is shorter than the header block and not a status code.
    #[error("Entry of {len} bytes has no header block")]
    MissingHeaderBlock { len: usize },

    /// Header block is not a JSON object.
    #[error("Invalid header block: {0}")]
    InvalidHeaderBlock(String),

    /// Negative entry does not hold a valid status code.
    #[error("Invalid status code in negative entry: {0}")]
    InvalidStatus(String),

    /// Body flagged as JSON does not parse.
    #[error("Invalid JSON body: {0}")]
    InvalidJsonBody(#[source] serde_json::Error),
}

/// Encodes an upstream error as a negative entry.
///
/// Returns `None` for errors that must not be cached (server errors and errors
/// without a status code).
pub fn encode_error(err: &SourceError) -> Option<Vec<u8>> {
    match err.status_code() {
        Some(code) if err.is_cacheable() => Some(code.to_string().into_bytes()),
        _ => None,
    }
}

/// Encodes a payload and its headers as a positive entry.
///
/// `x-tl-json` is set for non-binary payloads and removed for binary ones, so the
/// flag in the stored block always matches the body encoding.
///
/// # Errors
///
/// Returns [`CodecError::HeadersTooLarge`] when the serialized headers do not fit
/// in [`HEADER_BLOCK_SIZE`]; headers are never truncated.
pub fn encode(payload: &Payload, headers: &Headers) -> Result<Vec<u8>, CodecError> {
    let mut headers = headers.clone();
    if payload.is_bytes() {
        headers.remove(HEADER_JSON);
    } else {
        headers.insert(HEADER_JSON.to_string(), Value::Bool(true));
    }

    let header_json = serde_json::to_vec(&headers).map_err(CodecError::Serialize)?;
    if header_json.len() >= HEADER_BLOCK_SIZE {
        return Err(CodecError::HeadersTooLarge {
            size: header_json.len(),
            max: HEADER_BLOCK_SIZE - 1,
        });
    }

    let body = payload.to_body()?;
    let mut encoded = Vec::with_capacity(HEADER_BLOCK_SIZE + body.len());
    encoded.extend_from_slice(&header_json);
    encoded.resize(HEADER_BLOCK_SIZE, b' ');
    encoded.extend_from_slice(&body);
    Ok(encoded)
}

/// Decodes a stored entry.
///
/// # Errors
///
/// Any buffer that is neither all decimal digits nor a valid header block plus
/// body is corrupt. Callers treat that as a cache miss.
pub fn decode(bytes: &[u8]) -> Result<Decoded, CodecError> {
    if !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit) {
        return decode_status(bytes).map(|code| Decoded::Negative(SourceError::cached(code)));
    }

    if bytes.len() < HEADER_BLOCK_SIZE {
        return Err(CodecError::MissingHeaderBlock { len: bytes.len() });
    }

    let (block, body) = bytes.split_at(HEADER_BLOCK_SIZE);
    let block = std::str::from_utf8(block)
        .map_err(|e| CodecError::InvalidHeaderBlock(e.to_string()))?
        .trim_end();

    let headers = match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(headers)) => headers,
        Ok(other) => {
            return Err(CodecError::InvalidHeaderBlock(format!(
                "expected an object, found {}",
                other
            )))
        }
        Err(e) => return Err(CodecError::InvalidHeaderBlock(e.to_string())),
    };

    let payload = if headers.get(HEADER_JSON) == Some(&Value::Bool(true)) {
        match serde_json::from_slice::<Value>(body).map_err(CodecError::InvalidJsonBody)? {
            Value::String(text) => Payload::Text(text),
            value => Payload::Json(value),
        }
    } else {
        Payload::Bytes(body.to_vec())
    };

    Ok(Decoded::Positive(Entry { headers, payload }))
}

fn decode_status(bytes: &[u8]) -> Result<u16, CodecError> {
    // Digits only, so the buffer is valid ASCII.
    let text = String::from_utf8_lossy(bytes);
    text.parse::<u16>()
        .map_err(|_| CodecError::InvalidStatus(text.into_owned()))
}
