use serde::{Deserialize, Serialize};

use crate::domain::DatasetId;
use crate::em_metadata::EmMetadata;
use crate::error::IngestError;

pub const DEFAULT_RESOURCE_URL_FORMAT: &str = "resources/{dataset}/em-data/tiles/{index}";
pub const DEFAULT_SEGMENTATION_URL_FORMAT: &str =
    "resources/{dataset}/em-data/segmentation/{index}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplates {
    pub resource: String,
    pub segmentation: String,
}

impl Default for UrlTemplates {
    fn default() -> Self {
        Self {
            resource: DEFAULT_RESOURCE_URL_FORMAT.to_string(),
            segmentation: DEFAULT_SEGMENTATION_URL_FORMAT.to_string(),
        }
    }
}

impl UrlTemplates {
    fn expand(template: &str, dataset: &DatasetId) -> String {
        template.replace("{dataset}", dataset.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SegmentationMetadata {
    #[serde(default)]
    pub resolution: Option<(u32, u32)>,
}

impl SegmentationMetadata {
    pub fn from_json(content: &[u8]) -> Result<Self, IngestError> {
        serde_json::from_slice(content).map_err(|err| {
            IngestError::MetadataCorrupt(format!("segmentation metadata: {err}"))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub nb_slices: usize,
    pub tile_size: (u32, u32),
    pub slice_range: (u32, u32),
    pub segmentation_size: Option<(u32, u32)>,
    pub resource_url: String,
    pub segmentation_url: Option<String>,
}

impl ViewerConfig {
    pub fn resolve(
        dataset: &DatasetId,
        em: &EmMetadata,
        segmentation: Option<&SegmentationMetadata>,
        templates: &UrlTemplates,
    ) -> Result<Self, IngestError> {
        let first = em
            .slices
            .iter()
            .min_by_key(|entry| entry.slice)
            .ok_or_else(|| IngestError::MetadataCorrupt(format!("no slices for {dataset}")))?;

        let min_zoom = em.slices.iter().map(|entry| entry.minzoom).min().unwrap_or(first.minzoom);
        let max_zoom = em.slices.iter().map(|entry| entry.maxzoom).max().unwrap_or(first.maxzoom);
        if em.slices.iter().any(|entry| entry.tile_size != first.tile_size) {
            tracing::warn!(
                dataset = %dataset,
                "slices report different tile sizes, using {:?} from slice {}",
                first.tile_size,
                first.slice
            );
        }

        let segmentation_size = segmentation.and_then(|meta| meta.resolution);

        Ok(Self {
            min_zoom,
            max_zoom,
            nb_slices: em.number_slices,
            tile_size: first.tile_size,
            slice_range: em.slice_range,
            segmentation_size,
            resource_url: UrlTemplates::expand(&templates.resource, dataset),
            segmentation_url: segmentation_size
                .map(|_| UrlTemplates::expand(&templates.segmentation, dataset)),
        })
    }
}
