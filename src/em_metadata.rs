use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::piramid::Piramid;
use crate::tile::Tile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceMetadata {
    pub slice: u32,
    pub zooms: Vec<u32>,
    pub minzoom: u32,
    pub maxzoom: u32,
    pub tile_size: (u32, u32),
}

impl SliceMetadata {
    pub fn from_piramid(slice: u32, piramid: &Piramid) -> Result<Self, IngestError> {
        let (Some(minzoom), Some(maxzoom)) = (piramid.minzoom(), piramid.maxzoom()) else {
            return Err(IngestError::EmptyTileSet);
        };
        Ok(Self {
            slice,
            zooms: piramid.zooms(),
            minzoom,
            maxzoom,
            tile_size: piramid.tile_dimensions(),
        })
    }
}

/// Which side wins when both documents describe the same slice differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePrecedence {
    /// The argument of the merge replaces the receiver's entry.
    #[default]
    Incoming,
    /// The receiver keeps its entry; the argument only contributes new slices.
    Receiver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmMetadata {
    pub number_slices: usize,
    pub slice_range: (u32, u32),
    pub slices: Vec<SliceMetadata>,
}

impl EmMetadata {
    pub fn from_tiles(tiles: &[Tile]) -> Result<Self, IngestError> {
        let mut by_slice: BTreeMap<u32, Vec<Tile>> = BTreeMap::new();
        for tile in tiles {
            let slice = tile
                .slice()
                .ok_or_else(|| IngestError::MissingSlice(tile.path().as_std_path().to_path_buf()))?;
            by_slice.entry(slice).or_default().push(tile.clone());
        }

        let slices = by_slice
            .into_iter()
            .map(|(slice, stiles)| {
                let piramid = Piramid::build(&stiles)?;
                tracing::debug!(
                    slice,
                    levels = piramid.number_levels(),
                    "built slice pyramid"
                );
                SliceMetadata::from_piramid(slice, &piramid)
            })
            .collect::<Result<Vec<_>, IngestError>>()?;

        Self::from_slices(slices)
    }

    pub fn from_slices(slices: Vec<SliceMetadata>) -> Result<Self, IngestError> {
        let slices = slices
            .into_iter()
            .map(|entry| (entry.slice, entry))
            .collect::<BTreeMap<_, _>>();
        let (Some(first), Some(last)) = (slices.keys().next(), slices.keys().next_back()) else {
            return Err(IngestError::EmptyTileSet);
        };
        let slice_range = (*first, *last);

        Ok(Self {
            number_slices: slices.len(),
            slice_range,
            slices: slices.into_values().collect(),
        })
    }

    /// Merges `other` into this document; on a differing slice `other` wins.
    pub fn merge(&self, other: &EmMetadata) -> EmMetadata {
        self.merge_with(other, MergePrecedence::Incoming)
    }

    pub fn merge_with(&self, other: &EmMetadata, precedence: MergePrecedence) -> EmMetadata {
        let mut slices = self
            .slices
            .iter()
            .map(|entry| (entry.slice, entry.clone()))
            .collect::<BTreeMap<_, _>>();

        for incoming in &other.slices {
            match slices.get(&incoming.slice) {
                None => {
                    slices.insert(incoming.slice, incoming.clone());
                }
                Some(existing) if existing != incoming => {
                    if precedence == MergePrecedence::Incoming {
                        tracing::debug!(slice = incoming.slice, "replacing slice metadata");
                        slices.insert(incoming.slice, incoming.clone());
                    }
                }
                Some(_) => {}
            }
        }

        let slice_range = match (slices.keys().next(), slices.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => self.slice_range,
        };

        EmMetadata {
            number_slices: slices.len(),
            slice_range,
            slices: slices.into_values().collect(),
        }
    }

    pub fn slice(&self, slice: u32) -> Option<&SliceMetadata> {
        self.slices.iter().find(|entry| entry.slice == slice)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.slices.is_empty() {
            return Err(IngestError::MetadataCorrupt("no slices".to_string()));
        }
        if self.number_slices != self.slices.len() {
            return Err(IngestError::MetadataCorrupt(format!(
                "number_slices is {} but {} slices are listed",
                self.number_slices,
                self.slices.len()
            )));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.slices {
            if !seen.insert(entry.slice) {
                return Err(IngestError::MetadataCorrupt(format!(
                    "slice {} is listed more than once",
                    entry.slice
                )));
            }
            let bounds = entry.zooms.iter().min().zip(entry.zooms.iter().max());
            if bounds != Some((&entry.minzoom, &entry.maxzoom)) {
                return Err(IngestError::MetadataCorrupt(format!(
                    "slice {} zoom bounds ({}, {}) do not match its zooms {:?}",
                    entry.slice, entry.minzoom, entry.maxzoom, entry.zooms
                )));
            }
        }

        let range = (
            *seen.first().unwrap_or(&0),
            *seen.last().unwrap_or(&0),
        );
        if range != self.slice_range {
            return Err(IngestError::MetadataCorrupt(format!(
                "slice_range is {:?} but the slices span {:?}",
                self.slice_range, range
            )));
        }
        Ok(())
    }

    pub fn from_json(content: &[u8]) -> Result<Self, IngestError> {
        let metadata: EmMetadata = serde_json::from_slice(content)
            .map_err(|err| IngestError::MetadataCorrupt(err.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, IngestError> {
        serde_json::to_vec(self).map_err(|err| IngestError::Filesystem(err.to_string()))
    }

    pub fn to_json_pretty(&self, indent: usize) -> Result<Vec<u8>, IngestError> {
        let indent = " ".repeat(indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        Ok(out)
    }
}
