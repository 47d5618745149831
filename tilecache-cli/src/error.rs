//! CLI error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

use tilecache::cache::CodecError;
use tilecache::config::ConfigError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Failed to read an input file.
    Read { path: PathBuf, source: io::Error },

    /// Failed to write an output file.
    Write { path: PathBuf, source: io::Error },

    /// Stored entry could not be encoded or decoded.
    Codec(CodecError),

    /// Configuration could not be loaded.
    Config(ConfigError),

    /// Output could not be rendered as JSON.
    Render(serde_json::Error),

    /// Invalid command-line argument.
    InvalidArgument(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            CliError::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            CliError::Codec(e) => write!(f, "Entry error: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Render(e) => write!(f, "Failed to render output: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Read { source, .. } | CliError::Write { source, .. } => Some(source),
            CliError::Codec(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Render(e) => Some(e),
            CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        CliError::Codec(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Render(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}
