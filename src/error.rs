use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("invalid dataset identifier: {0}")]
    InvalidDatasetId(String),

    #[error("malformed EM tile name {path}: {reason}")]
    #[diagnostic(help("tiles must be named <slice>/<row>_<column>_<zoom>.<ext>"))]
    MalformedTileName { path: PathBuf, reason: String },

    #[error("unsupported EM tile image format: {0} (supported: jpg, jpeg, png)")]
    UnsupportedTileFormat(PathBuf),

    #[error("failed to read EM tile image {path}: {message}")]
    TileDecode { path: PathBuf, message: String },

    #[error(
        "EM tile {path} is {}x{} pixels, expected {}x{} like the other tiles of its zoom level",
        .found.0, .found.1, .expected.0, .expected.1
    )]
    #[diagnostic(help("tiles of one (slice, zoom) group must share the same pixel size"))]
    InconsistentTileSize {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("EM tile {path} has zoom {found}, expected {expected}")]
    MixedZoomLevels {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("EM tile {path} belongs to slice {found:?}, expected slice {expected:?}")]
    MixedSlices {
        path: PathBuf,
        expected: Option<u32>,
        found: Option<u32>,
    },

    #[error("EM tile {0} has no slice index")]
    MissingSlice(PathBuf),

    #[error("EM tile {path} needs a {columns}x{rows} grid, which exceeds {max_cells} cells")]
    #[diagnostic(help("row and column indices in tile names must stay within the pyramid level"))]
    TileGridTooLarge {
        path: PathBuf,
        columns: u64,
        rows: u64,
        max_cells: u64,
    },

    #[error("malformed segmentation file name {path}: {reason}")]
    #[diagnostic(help("segmentation files must be named s<slice>.json"))]
    MalformedSegmentationName { path: PathBuf, reason: String },

    #[error("tiles can not be an empty list")]
    EmptyTileGrid,

    #[error("no EM tiles to compute metadata from")]
    EmptyTileSet,

    #[error("EM tiles metadata is malformed: {0}")]
    MetadataCorrupt(String),

    #[error("EM tiles metadata not found for dataset: {0}")]
    MetadataNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("bucket {bucket}: {message}")]
    Storage { bucket: String, message: String },
}
