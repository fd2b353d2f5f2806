use crate::error::IngestError;
use crate::tile::Tile;

pub const MAX_GRID_CELLS: u64 = 1 << 20;

/// The shape is defined by the observed tiles: `(max column + 1, max row + 1)`.
/// Missing cells are `None` and never change the shape or the resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    zoom: u32,
    columns: u32,
    rows: u32,
    tile_size: (u32, u32),
    cells: Vec<Option<Tile>>,
}

impl TileGrid {
    pub fn from_tiles(tiles: &[Tile]) -> Result<Self, IngestError> {
        let first = tiles.first().ok_or(IngestError::EmptyTileGrid)?;
        let zoom = first.zoom();
        let tile_size = first.size()?;

        let mut columns: u64 = 0;
        let mut rows: u64 = 0;
        let mut widest = first;
        for tile in tiles {
            if tile.zoom() != zoom {
                return Err(IngestError::MixedZoomLevels {
                    path: tile.path().as_std_path().to_path_buf(),
                    expected: zoom,
                    found: tile.zoom(),
                });
            }
            let size = tile.size()?;
            if size != tile_size {
                return Err(IngestError::InconsistentTileSize {
                    path: tile.path().as_std_path().to_path_buf(),
                    expected: tile_size,
                    found: size,
                });
            }
            let position = tile.position();
            let (column_end, row_end) = (
                u64::from(position.column) + 1,
                u64::from(position.row) + 1,
            );
            if column_end > columns || row_end > rows {
                widest = tile;
            }
            columns = columns.max(column_end);
            rows = rows.max(row_end);
        }

        let cell_count = columns
            .checked_mul(rows)
            .filter(|count| *count <= MAX_GRID_CELLS)
            .ok_or_else(|| IngestError::TileGridTooLarge {
                path: widest.path().as_std_path().to_path_buf(),
                columns,
                rows,
                max_cells: MAX_GRID_CELLS,
            })?;
        // product is bounded, each side fits in u32
        let (columns, rows) = (columns as u32, rows as u32);

        let mut cells = vec![None; cell_count as usize];
        for tile in tiles {
            let position = tile.position();
            let index = position.row as usize * columns as usize + position.column as usize;
            if let Some(previous) = cells[index].replace(tile.clone()) {
                tracing::debug!(
                    previous = %previous.path(),
                    current = %tile.path(),
                    "duplicate tile position {position}, keeping the last one"
                );
            }
        }

        Ok(Self {
            zoom,
            columns,
            rows,
            tile_size,
            cells,
        })
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn size(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub fn get(&self, column: u32, row: u32) -> Option<&Tile> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells[row as usize * self.columns as usize + column as usize].as_ref()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<Tile>]> {
        self.cells.chunks(self.columns as usize)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn hole_count(&self) -> usize {
        self.cells.len() - self.tile_count()
    }

    pub fn tile_dimensions(&self) -> (u32, u32) {
        self.tile_size
    }

    pub fn resolution(&self) -> (u64, u64) {
        let (width, height) = self.tile_size;
        (
            u64::from(self.columns) * u64::from(width),
            u64::from(self.rows) * u64::from(height),
        )
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::tile::GridPosition;

    fn tile(column: u32, row: u32) -> Tile {
        Tile::with_size(
            GridPosition::new(column, row),
            3,
            Utf8PathBuf::from(format!("7/{row}_{column}_3.jpg")),
            Some(7),
            (256, 128),
        )
    }

    #[test]
    fn rows_are_row_major_chunks() {
        let grid = TileGrid::from_tiles(&[tile(0, 0), tile(2, 1)]).unwrap();
        let rows: Vec<_> = grid.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1][2].as_ref(), Some(&tile(2, 1)));
        assert_eq!(grid.hole_count(), 4);
    }

    #[test]
    fn out_of_range_lookup_is_none() {
        let grid = TileGrid::from_tiles(&[tile(1, 1)]).unwrap();
        assert!(grid.get(2, 0).is_none());
        assert!(grid.get(0, 0).is_none());
        assert_eq!(grid.get(1, 1), Some(&tile(1, 1)));
    }

    #[test]
    fn resolution_uses_tile_width_for_columns() {
        let grid = TileGrid::from_tiles(&[tile(2, 0)]).unwrap();
        assert_eq!(grid.size(), (3, 1));
        assert_eq!(grid.resolution(), (768, 128));
    }
}
