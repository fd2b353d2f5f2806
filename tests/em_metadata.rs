use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use celegans_ingestion::em_metadata::{EmMetadata, MergePrecedence, SliceMetadata};
use celegans_ingestion::error::IngestError;
use celegans_ingestion::tile::{GridPosition, Tile};

fn tile(column: u32, row: u32, zoom: u32, slice: u32) -> Tile {
    Tile::with_size(
        GridPosition::new(column, row),
        zoom,
        Utf8PathBuf::from(format!("em-tiles/{slice}/{row}_{column}_{zoom}.jpg")),
        Some(slice),
        (512, 512),
    )
}

fn slice_meta(slice: u32, zooms: &[u32]) -> SliceMetadata {
    SliceMetadata {
        slice,
        zooms: zooms.to_vec(),
        minzoom: *zooms.iter().min().unwrap(),
        maxzoom: *zooms.iter().max().unwrap(),
        tile_size: (512, 512),
    }
}

fn metadata(slices: Vec<SliceMetadata>) -> EmMetadata {
    EmMetadata::from_slices(slices).unwrap()
}

#[test]
fn single_slice_summary() {
    let mut tiles = Vec::new();
    for row in 0..3 {
        for column in 1..4 {
            tiles.push(tile(column, row, 4, 209));
        }
    }
    for row in 0..2 {
        for column in 0..2 {
            tiles.push(tile(column, row, 5, 209));
        }
    }

    let metadata = EmMetadata::from_tiles(&tiles).unwrap();
    assert_eq!(metadata.number_slices, 1);
    assert_eq!(metadata.slice_range, (209, 209));
    assert_eq!(
        metadata.slices,
        vec![SliceMetadata {
            slice: 209,
            zooms: vec![4, 5],
            minzoom: 4,
            maxzoom: 5,
            tile_size: (512, 512),
        }]
    );
}

#[test]
fn slice_range_allows_gaps() {
    let tiles: Vec<Tile> = [7, 2, 1, 3]
        .into_iter()
        .flat_map(|slice| [tile(0, 0, 1, slice), tile(0, 0, 2, slice)])
        .collect();

    let metadata = EmMetadata::from_tiles(&tiles).unwrap();
    assert_eq!(metadata.slice_range, (1, 7));
    assert_eq!(metadata.number_slices, 4);
    let order: Vec<u32> = metadata.slices.iter().map(|s| s.slice).collect();
    assert_eq!(order, vec![1, 2, 3, 7]);
    metadata.validate().unwrap();
}

#[test]
fn empty_and_sliceless_inputs_are_rejected() {
    assert_matches!(EmMetadata::from_tiles(&[]).unwrap_err(), IngestError::EmptyTileSet);

    let sliceless = Tile::with_size(
        GridPosition::new(0, 0),
        1,
        Utf8PathBuf::from("0_0_1.jpg"),
        None,
        (512, 512),
    );
    assert_matches!(
        EmMetadata::from_tiles(&[sliceless]).unwrap_err(),
        IngestError::MissingSlice(_)
    );
}

#[test]
fn merge_unions_and_replaces_changed_slices() {
    let mt1 = metadata(vec![
        slice_meta(1, &[1, 2, 3, 4, 5]),
        slice_meta(2, &[1, 2, 3, 4, 5]),
        slice_meta(3, &[1, 2, 3, 4, 5]),
    ]);
    let mt2 = metadata(vec![
        slice_meta(0, &[1, 2, 3, 4, 5]),
        slice_meta(1, &[1, 2, 3, 4, 5]),
        slice_meta(3, &[1, 5, 6]),
        slice_meta(4, &[1, 2, 3, 4, 5]),
    ]);

    let expected = EmMetadata {
        number_slices: 5,
        slice_range: (0, 4),
        slices: vec![
            slice_meta(0, &[1, 2, 3, 4, 5]),
            slice_meta(1, &[1, 2, 3, 4, 5]),
            slice_meta(2, &[1, 2, 3, 4, 5]),
            slice_meta(3, &[1, 5, 6]),
            slice_meta(4, &[1, 2, 3, 4, 5]),
        ],
    };

    assert_eq!(mt1.merge(&mt2), expected);
    assert_eq!(mt1.merge_with(&mt2, MergePrecedence::Incoming), expected);
}

#[test]
fn merge_with_receiver_precedence_keeps_own_slices() {
    let receiver = metadata(vec![slice_meta(3, &[1, 2]), slice_meta(5, &[1])]);
    let incoming = metadata(vec![slice_meta(3, &[1, 5, 6]), slice_meta(9, &[2])]);

    let merged = receiver.merge_with(&incoming, MergePrecedence::Receiver);
    assert_eq!(merged.slice(3), Some(&slice_meta(3, &[1, 2])));
    assert_eq!(merged.slice(9), Some(&slice_meta(9, &[2])));
    assert_eq!(merged.slice_range, (3, 9));
    assert_eq!(merged.number_slices, 3);
}

#[test]
fn merge_with_itself_is_identity() {
    let mt = metadata(vec![slice_meta(1, &[1, 2]), slice_meta(4, &[3])]);
    assert_eq!(mt.merge(&mt), mt);
}

#[test]
fn merge_of_disjoint_documents_keeps_contents() {
    let a = metadata(vec![slice_meta(1, &[1, 2]), slice_meta(2, &[2])]);
    let b = metadata(vec![slice_meta(10, &[4, 5]), slice_meta(11, &[5])]);

    let merged = a.merge(&b);
    assert_eq!(merged.number_slices, 4);
    assert_eq!(merged.slice_range, (1, 11));
    for entry in a.slices.iter().chain(b.slices.iter()) {
        assert_eq!(merged.slice(entry.slice), Some(entry));
    }
    // operands are untouched
    assert_eq!(a.number_slices, 2);
    assert_eq!(b.slice_range, (10, 11));
}

#[test]
fn json_round_trip_preserves_document() {
    let mt = metadata(vec![slice_meta(1, &[1, 2]), slice_meta(4, &[3])]);
    let parsed = EmMetadata::from_json(&mt.to_json().unwrap()).unwrap();
    assert_eq!(parsed, mt);
}

#[test]
fn corrupt_slice_range_is_rejected() {
    let mut mt = metadata(vec![slice_meta(1, &[1, 2]), slice_meta(4, &[3])]);
    mt.slice_range = (0, 4);
    assert_matches!(mt.validate().unwrap_err(), IngestError::MetadataCorrupt(_));
}
