use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::error::IngestError;
use crate::store::walk_dir;
use crate::tile::{GridPosition, Tile};

pub const SUPPORTED_TILE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn tile_stem_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)_(\d+)_(\d+)$").expect("valid tile stem regex"))
}

fn has_supported_extension(path: &Utf8Path) -> bool {
    path.extension()
        .map(|ext| {
            SUPPORTED_TILE_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn malformed(path: &Utf8Path, reason: impl Into<String>) -> IngestError {
    IngestError::MalformedTileName {
        path: path.as_std_path().to_path_buf(),
        reason: reason.into(),
    }
}

fn parse_index(path: &Utf8Path, field: &str, value: &str) -> Result<u32, IngestError> {
    value
        .parse()
        .map_err(|_| malformed(path, format!("{field} '{value}' is out of range")))
}

pub fn parse_tile_path(path: &Utf8Path) -> Result<Tile, IngestError> {
    if !has_supported_extension(path) {
        return Err(IngestError::UnsupportedTileFormat(
            path.as_std_path().to_path_buf(),
        ));
    }

    let stem = path
        .file_stem()
        .ok_or_else(|| malformed(path, "missing file name"))?;
    let captures = tile_stem_regex()
        .captures(stem)
        .ok_or_else(|| malformed(path, "expected <row>_<column>_<zoom>"))?;
    let row = parse_index(path, "row", &captures[1])?;
    let column = parse_index(path, "column", &captures[2])?;
    let zoom = parse_index(path, "zoom", &captures[3])?;

    let slice_dir = path
        .parent()
        .and_then(Utf8Path::file_name)
        .ok_or_else(|| malformed(path, "missing slice directory"))?;
    if slice_dir.is_empty() || !slice_dir.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(malformed(
            path,
            format!("could not extract slice information from directory '{slice_dir}'"),
        ));
    }
    let slice = parse_index(path, "slice", slice_dir)?;

    Ok(Tile::new(
        GridPosition::new(column, row),
        zoom,
        path.to_path_buf(),
        Some(slice),
    ))
}

fn looks_like_tile(path: &Utf8Path) -> bool {
    has_supported_extension(path)
        && path
            .file_stem()
            .map(|stem| stem.split('_').count() == 3)
            .unwrap_or(false)
}

pub fn discover_tiles(paths: &[Utf8PathBuf]) -> Result<Vec<Tile>, IngestError> {
    let files = match paths {
        [dir] if dir.as_std_path().is_dir() => {
            let mut files = Vec::new();
            for path in walk_dir(dir.as_std_path())? {
                if !path.is_file() {
                    continue;
                }
                let path = Utf8PathBuf::from_path_buf(path).map_err(|path| {
                    IngestError::Filesystem(format!("non-utf8 tile path: {}", path.display()))
                })?;
                if looks_like_tile(&path) {
                    files.push(path);
                }
            }
            files
        }
        _ => paths.to_vec(),
    };

    let mut tiles = files
        .iter()
        .map(|path| parse_tile_path(path))
        .collect::<Result<Vec<_>, IngestError>>()?;
    tiles.sort_by(|a, b| a.path().cmp(b.path()));
    tracing::debug!(count = tiles.len(), "discovered EM tiles");
    Ok(tiles)
}

pub fn tiles_root(tiles: &[Tile]) -> Option<Utf8PathBuf> {
    let root = |tile: &Tile| tile.path().parent().and_then(Utf8Path::parent).map(Utf8Path::to_path_buf);
    let first = root(tiles.first()?)?;
    tiles
        .iter()
        .all(|tile| root(tile).as_ref() == Some(&first))
        .then_some(first)
}
