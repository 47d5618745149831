//! Producer-facing types: coordinates, operation kinds and the source traits.

use std::fmt;

use crate::cache::{BoxFuture, FetchResult, SourceOptions};
use crate::error::SourceError;

/// Tile coordinate in XYZ addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    /// Zoom level
    pub z: u8,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl Coord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// The operations a source may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Tile,
    Grid,
}

impl OperationKind {
    /// Cache key namespace of this operation.
    pub fn namespace(&self) -> &'static str {
        match self {
            OperationKind::Tile => "tile",
            OperationKind::Grid => "grid",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Which operations a source implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub tile: bool,
    pub grid: bool,
}

impl Capabilities {
    /// Tiles only.
    pub fn tiles() -> Self {
        Self {
            tile: true,
            grid: false,
        }
    }

    /// Grids only.
    pub fn grids() -> Self {
        Self {
            tile: false,
            grid: true,
        }
    }

    /// Tiles and grids.
    pub fn all() -> Self {
        Self {
            tile: true,
            grid: true,
        }
    }

    pub fn supports(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Tile => self.tile,
            OperationKind::Grid => self.grid,
        }
    }
}

/// A producer of tiles and/or grids.
///
/// Implementors override the operations they support and report them through
/// [`capabilities`](TileSource::capabilities). The defaults fail with
/// [`SourceError::unsupported`].
pub trait TileSource: Send + Sync + 'static {
    /// Operations this source implements.
    fn capabilities(&self) -> Capabilities;

    /// Fetch the rendered tile at `coord`.
    fn get_tile(&self, coord: Coord) -> BoxFuture<'_, FetchResult> {
        let _ = coord;
        Box::pin(async { Err(SourceError::unsupported(OperationKind::Tile)) })
    }

    /// Fetch the UTF grid at `coord`.
    fn get_grid(&self, coord: Coord) -> BoxFuture<'_, FetchResult> {
        let _ = coord;
        Box::pin(async { Err(SourceError::unsupported(OperationKind::Grid)) })
    }
}

/// A source that can be constructed from a URI and options.
pub trait OpenSource: TileSource + Sized {
    /// Open the source at `uri`.
    ///
    /// # Arguments
    ///
    /// * `uri` - Location of the source; also its identity for cache keys
    /// * `options` - Source-specific options, passed through unmodified
    fn open<'a>(uri: &'a str, options: &'a SourceOptions)
        -> BoxFuture<'a, Result<Self, SourceError>>;
}
