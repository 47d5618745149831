//! CLI subcommands.

pub mod config;
pub mod encode;
pub mod inspect;

use std::fs;
use std::path::Path;

use crate::error::CliError;

/// Read a whole file.
fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}
