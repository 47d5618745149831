//! `tilecache encode`: produce a stored entry from a file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;
use tilecache::cache::codec;
use tilecache::cache::{Headers, Payload};
use tilecache::SourceError;
use tracing::debug;

use crate::error::CliError;

/// Arguments of the encode command.
#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// File holding the body of the entry
    pub input: PathBuf,

    /// Where to write the encoded entry
    #[arg(short, long)]
    pub output: PathBuf,

    /// Header to store, as name=value (repeatable)
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,

    /// Parse the input as JSON instead of storing raw bytes
    #[arg(long)]
    pub json: bool,

    /// Write a negative entry for this 4xx status instead
    #[arg(long)]
    pub status: Option<u16>,
}

/// Run the encode command.
pub fn run(args: &EncodeArgs) -> Result<(), CliError> {
    let entry = match args.status {
        Some(status) => encode_status(status)?,
        None => {
            let body = super::read_file(&args.input)?;
            encode_body(body, &args.headers, args.json)?
        }
    };

    write_file(&args.output, &entry)?;
    println!("Wrote {} bytes to {}", entry.len(), args.output.display());
    Ok(())
}

/// Negative entry for a client-error status.
pub fn encode_status(status: u16) -> Result<Vec<u8>, CliError> {
    codec::encode_error(&SourceError::with_status("", status)).ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "status {} is not cacheable; only 4xx statuses are stored",
            status
        ))
    })
}

/// Positive entry for `body` with the given `name=value` headers.
pub fn encode_body(body: Vec<u8>, headers: &[String], json: bool) -> Result<Vec<u8>, CliError> {
    let payload = if json {
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| CliError::InvalidArgument(format!("input is not valid JSON: {}", e)))?;
        Payload::Json(value)
    } else {
        Payload::Bytes(body)
    };

    let headers = parse_headers(headers)?;
    debug!(headers = headers.len(), payload = payload.kind(), "Encoding entry");
    Ok(codec::encode(&payload, &headers)?)
}

fn parse_headers(raw: &[String]) -> Result<Headers, CliError> {
    let mut headers = Headers::new();
    for header in raw {
        let (name, value) = header.split_once('=').ok_or_else(|| {
            CliError::InvalidArgument(format!("header '{}' is not NAME=VALUE", header))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::InvalidArgument(format!(
                "header '{}' has an empty name",
                header
            )));
        }
        headers.insert(name.to_ascii_lowercase(), Value::String(value.to_string()));
    }
    Ok(headers)
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), CliError> {
    fs::write(path, data).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tilecache::cache::codec::Decoded;

    fn headers(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_encode_status() {
        assert_eq!(encode_status(404).unwrap(), b"404".to_vec());
        assert!(matches!(
            encode_status(500),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_encode_body_with_headers() {
        let entry = encode_body(
            vec![1, 2, 3],
            &headers(&["Content-Type=image/png", "etag=a=b"]),
            false,
        )
        .unwrap();
        assert_eq!(entry.len(), codec::HEADER_BLOCK_SIZE + 3);

        match codec::decode(&entry).unwrap() {
            Decoded::Positive(decoded) => {
                assert_eq!(decoded.payload, Payload::Bytes(vec![1, 2, 3]));
                assert_eq!(decoded.headers.get("content-type"), Some(&json!("image/png")));
                assert_eq!(decoded.headers.get("etag"), Some(&json!("a=b")));
            }
            Decoded::Negative(_) => panic!("expected a positive entry"),
        }
    }

    #[test]
    fn test_encode_json_body() {
        let entry = encode_body(br#"{"grid":[]}"#.to_vec(), &[], true).unwrap();
        match codec::decode(&entry).unwrap() {
            Decoded::Positive(decoded) => {
                assert_eq!(decoded.payload, Payload::Json(json!({"grid": []})));
            }
            Decoded::Negative(_) => panic!("expected a positive entry"),
        }

        assert!(matches!(
            encode_body(b"not json".to_vec(), &[], true),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        assert!(matches!(
            encode_body(vec![], &headers(&["no-equals"]), false),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            encode_body(vec![], &headers(&["=value"]), false),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oversized_headers_are_rejected() {
        let big = format!("x-big={}", "x".repeat(2000));
        assert!(matches!(
            encode_body(vec![], &[big], false),
            Err(CliError::Codec(_))
        ));
    }

    #[test]
    fn test_run_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tile.png");
        let output = dir.path().join("tile.entry");
        fs::write(&input, [0x89, b'P', b'N', b'G']).unwrap();

        let args = EncodeArgs {
            input,
            output: output.clone(),
            headers: headers(&["content-type=image/png"]),
            json: false,
            status: None,
        };
        run(&args).unwrap();

        let written = fs::read(&output).unwrap();
        assert_eq!(written.len(), codec::HEADER_BLOCK_SIZE + 4);
    }
}
