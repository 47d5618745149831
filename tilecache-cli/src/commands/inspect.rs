//! `tilecache inspect`: describe a stored entry.

use std::path::Path;

use tilecache::cache::codec::{self, Decoded};
use tilecache::cache::Payload;

use crate::error::CliError;

/// Run the inspect command.
pub fn run(path: &Path) -> Result<(), CliError> {
    let bytes = super::read_file(path)?;
    print!("{}", describe(&bytes)?);
    Ok(())
}

/// Human-readable description of a stored entry.
pub fn describe(bytes: &[u8]) -> Result<String, CliError> {
    let mut out = String::new();

    match codec::decode(bytes)? {
        Decoded::Negative(err) => {
            out.push_str("Negative entry\n");
            if let Some(status) = err.status_code() {
                out.push_str(&format!("  Status: {}\n", status));
            }
        }
        Decoded::Positive(entry) => {
            out.push_str("Positive entry\n");
            out.push_str("  Headers:\n");
            for (name, value) in &entry.headers {
                match value.as_str() {
                    Some(text) => out.push_str(&format!("    {}: {}\n", name, text)),
                    None => out.push_str(&format!("    {}: {}\n", name, value)),
                }
            }
            out.push_str(&format!("  Payload: {}\n", entry.payload.kind()));
            match &entry.payload {
                Payload::Bytes(data) => out.push_str(&format!("  Size: {} bytes\n", data.len())),
                Payload::Text(text) => {
                    out.push_str(&format!("  Size: {} chars\n", text.chars().count()))
                }
                Payload::Json(value) => {
                    out.push_str(&serde_json::to_string_pretty(value)?);
                    out.push('\n');
                }
            }
        }
    }

    Ok(out)
}
