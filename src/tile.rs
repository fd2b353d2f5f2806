use std::fmt;
use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPosition {
    pub column: u32,
    pub row: u32,
}

impl GridPosition {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// The pixel size is read from the image header the first time [`Tile::size`]
/// is called and cached for the lifetime of the value. The outcome of that read,
/// success or failure, is computed at most once even when the tile is shared
/// between threads.
#[derive(Debug, Clone)]
pub struct Tile {
    position: GridPosition,
    zoom: u32,
    path: Utf8PathBuf,
    slice: Option<u32>,
    size: OnceLock<Result<(u32, u32), String>>,
}

impl Tile {
    pub fn new(position: GridPosition, zoom: u32, path: Utf8PathBuf, slice: Option<u32>) -> Self {
        Self {
            position,
            zoom,
            path,
            slice,
            size: OnceLock::new(),
        }
    }

    pub fn with_size(
        position: GridPosition,
        zoom: u32,
        path: Utf8PathBuf,
        slice: Option<u32>,
        size: (u32, u32),
    ) -> Self {
        let tile = Self::new(position, zoom, path, slice);
        let _ = tile.size.set(Ok(size));
        tile
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn slice(&self) -> Option<u32> {
        self.slice
    }

    pub fn size(&self) -> Result<(u32, u32), IngestError> {
        self.size
            .get_or_init(|| {
                tracing::debug!(path = %self.path, "reading tile image header");
                image::image_dimensions(self.path.as_std_path()).map_err(|err| err.to_string())
            })
            .clone()
            .map_err(|message| IngestError::TileDecode {
                path: self.path.clone().into_std_path_buf(),
                message,
            })
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.zoom == other.zoom
            && self.path == other.path
            && self.slice == other.slice
    }
}

impl Eq for Tile {}
