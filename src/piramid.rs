use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::IngestError;
use crate::grid::TileGrid;
use crate::tile::Tile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub min_x: u64,
    pub min_y: u64,
    pub max_x: u64,
    pub max_y: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Piramid {
    slice: Option<u32>,
    levels: BTreeMap<u32, TileGrid>,
}

impl Piramid {
    pub fn build(tiles: &[Tile]) -> Result<Self, IngestError> {
        let slice = tiles.first().and_then(Tile::slice);

        let mut groups: BTreeMap<u32, Vec<Tile>> = BTreeMap::new();
        for tile in tiles {
            if tile.slice() != slice {
                return Err(IngestError::MixedSlices {
                    path: tile.path().as_std_path().to_path_buf(),
                    expected: slice,
                    found: tile.slice(),
                });
            }
            groups.entry(tile.zoom()).or_default().push(tile.clone());
        }

        let levels = groups
            .into_iter()
            .map(|(zoom, ztiles)| Ok((zoom, TileGrid::from_tiles(&ztiles)?)))
            .collect::<Result<BTreeMap<_, _>, IngestError>>()?;

        Ok(Self { slice, levels })
    }

    pub fn slice(&self) -> Option<u32> {
        self.slice
    }

    pub fn levels(&self) -> &BTreeMap<u32, TileGrid> {
        &self.levels
    }

    pub fn level(&self, zoom: u32) -> Option<&TileGrid> {
        self.levels.get(&zoom)
    }

    pub fn number_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn zooms(&self) -> Vec<u32> {
        self.levels.keys().copied().collect()
    }

    pub fn minzoom(&self) -> Option<u32> {
        self.levels.keys().next().copied()
    }

    pub fn maxzoom(&self) -> Option<u32> {
        self.levels.keys().next_back().copied()
    }

    pub fn extent(&self) -> Option<Extent> {
        let (max_x, max_y) = self.finest_level()?.resolution();
        Some(Extent {
            min_x: 0,
            min_y: 0,
            max_x,
            max_y,
        })
    }

    pub fn tile_dimensions(&self) -> (u32, u32) {
        self.finest_level()
            .map(TileGrid::tile_dimensions)
            .unwrap_or((0, 0))
    }

    fn finest_level(&self) -> Option<&TileGrid> {
        self.levels.values().next_back()
    }
}
