use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use celegans_ingestion::discovery::parse_tile_path;
use celegans_ingestion::error::IngestError;
use celegans_ingestion::grid::{MAX_GRID_CELLS, TileGrid};
use celegans_ingestion::tile::{GridPosition, Tile};

fn tile(column: u32, row: u32, zoom: u32) -> Tile {
    sized_tile(column, row, zoom, (512, 512))
}

fn sized_tile(column: u32, row: u32, zoom: u32, size: (u32, u32)) -> Tile {
    Tile::with_size(
        GridPosition::new(column, row),
        zoom,
        Utf8PathBuf::from(format!("em-tiles/209/{row}_{column}_{zoom}.jpg")),
        Some(209),
        size,
    )
}

fn full_grid(columns: u32, rows: u32, zoom: u32) -> Vec<Tile> {
    (0..rows)
        .flat_map(|row| (0..columns).map(move |column| tile(column, row, zoom)))
        .collect()
}

#[test]
fn tile_matrix_zoom5() {
    let tiles = full_grid(2, 2, 5);
    let grid = TileGrid::from_tiles(&tiles).unwrap();

    assert_eq!(grid.zoom(), 5);
    assert_eq!(grid.size(), (2, 2));
    assert_eq!(grid.resolution(), (1024, 1024));
    for t in &tiles {
        let position = t.position();
        assert_eq!(grid.get(position.column, position.row), Some(t));
    }
}

#[test]
fn tile_matrix_with_missing_first_column() {
    let tiles: Vec<Tile> = (0..3)
        .flat_map(|row| (1..4).map(move |column| tile(column, row, 4)))
        .collect();
    let grid = TileGrid::from_tiles(&tiles).unwrap();

    assert_eq!(grid.size(), (4, 3));
    assert_eq!(grid.resolution(), (2048, 1536));
    assert!((0..3).all(|row| grid.get(0, row).is_none()));
    assert_eq!(grid.tile_count(), 9);
    assert_eq!(grid.hole_count(), 3);
}

#[test]
fn shape_is_defined_by_max_position_regardless_of_holes() {
    let tiles = vec![tile(4, 0, 2), tile(0, 6, 2), tile(2, 3, 2)];
    let grid = TileGrid::from_tiles(&tiles).unwrap();
    assert_eq!(grid.size(), (5, 7));

    let reordered = vec![tile(2, 3, 2), tile(0, 6, 2), tile(4, 0, 2)];
    assert_eq!(TileGrid::from_tiles(&reordered).unwrap(), grid);
}

#[test]
fn holes_keep_the_resolution() {
    let full = TileGrid::from_tiles(&full_grid(3, 3, 5)).unwrap();

    // keep the corner tiles so the shape does not shrink
    let sparse: Vec<Tile> = full_grid(3, 3, 5)
        .into_iter()
        .filter(|t| {
            let p = t.position();
            (p.column == 2 && p.row == 2) || (p.column + p.row) % 2 == 1
        })
        .collect();
    let grid = TileGrid::from_tiles(&sparse).unwrap();

    assert_eq!(grid.size(), full.size());
    assert_eq!(grid.resolution(), full.resolution());
    assert!(grid.hole_count() > 0);
}

#[test]
fn missing_row_shrinks_the_grid() {
    let tiles: Vec<Tile> = full_grid(2, 2, 5)
        .into_iter()
        .filter(|t| t.position().row != 1)
        .collect();
    let grid = TileGrid::from_tiles(&tiles).unwrap();
    assert_eq!(grid.size(), (2, 1));
    assert_eq!(grid.resolution(), (1024, 512));
}

#[test]
fn missing_column_shrinks_the_grid() {
    let tiles: Vec<Tile> = full_grid(2, 2, 5)
        .into_iter()
        .filter(|t| t.position().column != 1)
        .collect();
    let grid = TileGrid::from_tiles(&tiles).unwrap();
    assert_eq!(grid.size(), (1, 2));
    assert_eq!(grid.resolution(), (512, 1024));
}

#[test]
fn non_uniform_tile_size_is_rejected() {
    let tiles = vec![sized_tile(0, 0, 5, (512, 512)), sized_tile(0, 0, 5, (256, 512))];
    let err = TileGrid::from_tiles(&tiles).unwrap_err();
    assert_matches!(
        err,
        IngestError::InconsistentTileSize {
            expected: (512, 512),
            found: (256, 512),
            ..
        }
    );
}

#[test]
fn empty_tile_list_is_rejected() {
    let err = TileGrid::from_tiles(&[]).unwrap_err();
    assert_matches!(err, IngestError::EmptyTileGrid);
}

#[test]
fn mixed_zoom_levels_are_rejected() {
    let err = TileGrid::from_tiles(&[tile(0, 0, 4), tile(1, 0, 5)]).unwrap_err();
    assert_matches!(err, IngestError::MixedZoomLevels { expected: 4, found: 5, .. });
}

#[test]
fn index_at_u32_max_is_reported_not_panicking() {
    let tile = parse_tile_path(Utf8Path::new("em/1/0_4294967295_1.jpg")).unwrap();
    let tile = Tile::with_size(
        tile.position(),
        tile.zoom(),
        tile.path().to_path_buf(),
        tile.slice(),
        (512, 512),
    );

    let err = TileGrid::from_tiles(&[tile]).unwrap_err();
    assert_matches!(
        err,
        IngestError::TileGridTooLarge {
            columns: 4_294_967_296,
            rows: 1,
            ..
        }
    );
}

#[test]
fn oversized_grid_is_rejected_before_allocating() {
    let tiles = vec![tile(0, 0, 3), tile(4_000_000_000, 4_000_000_000, 3)];
    let err = TileGrid::from_tiles(&tiles).unwrap_err();
    match err {
        IngestError::TileGridTooLarge { path, max_cells, .. } => {
            assert_eq!(max_cells, MAX_GRID_CELLS);
            assert!(path.ends_with("4000000000_4000000000_3.jpg"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn one_row_past_the_cell_limit_is_rejected() {
    let side = 1u32 << 10;
    assert_eq!(u64::from(side) * u64::from(side), MAX_GRID_CELLS);

    let err = TileGrid::from_tiles(&[tile(side - 1, side, 6)]).unwrap_err();
    assert_matches!(err, IngestError::TileGridTooLarge { columns: 1024, rows: 1025, .. });
}
