use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::bucket::{
    Bucket, RemoteStorage, UploadAction, em_metadata_blob_name, em_tile_blob_name,
    segmentation_blob_name, segmentation_metadata_blob_name,
};
use crate::config::ResolvedConfig;
use crate::discovery::{discover_tiles, tiles_root};
use crate::domain::DatasetId;
use crate::em_metadata::EmMetadata;
use crate::error::IngestError;
use crate::segmentation::find_segmentation_files;
use crate::store::Store;
use crate::viewer::{SegmentationMetadata, ViewerConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub overwrite: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub dataset: String,
    pub dry_run: bool,
    pub tiles: usize,
    pub metadata: Option<MetadataUpload>,
    pub tile_uploads: UploadSummary,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataUpload {
    pub number_slices: usize,
    pub slice_range: (u32, u32),
    pub merged_with_remote: bool,
    pub remote_discarded: bool,
    pub local_path: String,
    pub blob: String,
    pub action: UploadAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentationResult {
    pub dataset: String,
    pub dry_run: bool,
    pub files: usize,
    pub uploads: UploadSummary,
    pub resolutions: Option<UploadAction>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub dry_run: usize,
}

impl UploadSummary {
    fn record(&mut self, action: UploadAction) {
        match action {
            UploadAction::Uploaded => self.uploaded += 1,
            UploadAction::Skipped => self.skipped += 1,
            UploadAction::DryRun => self.dry_run += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<B: Bucket> {
    store: Store,
    bucket: B,
    config: ResolvedConfig,
}

impl<B: Bucket> App<B> {
    pub fn new(store: Store, bucket: B, config: ResolvedConfig) -> Self {
        Self {
            store,
            bucket,
            config,
        }
    }

    pub fn bucket(&self) -> &B {
        &self.bucket
    }

    pub fn compute_metadata(
        &self,
        paths: &[Utf8PathBuf],
        sink: &dyn ProgressSink,
    ) -> Result<EmMetadata, IngestError> {
        sink.event(ProgressEvent {
            message: "phase=Discover; scanning EM tiles".to_string(),
            elapsed: None,
        });
        let tiles = discover_tiles(paths)?;

        let start = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Metadata; reading {} tiles", tiles.len()),
            elapsed: None,
        });
        let metadata = EmMetadata::from_tiles(&tiles)?;
        sink.event(ProgressEvent {
            message: format!("phase=Metadata; {} slices", metadata.number_slices),
            elapsed: Some(start.elapsed()),
        });
        Ok(metadata)
    }

    pub fn ingest_em(
        &self,
        dataset: &DatasetId,
        paths: &[Utf8PathBuf],
        options: IngestOptions,
        sink: &dyn ProgressSink,
    ) -> Result<IngestResult, IngestError> {
        let storage = RemoteStorage::new(&self.bucket, options.dry_run);

        sink.event(ProgressEvent {
            message: "phase=Discover; scanning EM tiles".to_string(),
            elapsed: None,
        });
        let tiles = discover_tiles(paths)?;
        if tiles.is_empty() {
            tracing::warn!("skipping EM tiles upload: no files found");
            return Ok(IngestResult {
                dataset: dataset.to_string(),
                dry_run: options.dry_run,
                tiles: 0,
                metadata: None,
                tile_uploads: UploadSummary::default(),
                finished_at: iso_timestamp(),
            });
        }

        let start = Instant::now();
        sink.event(ProgressEvent {
            message: "phase=Metadata; calculating EM tiles metadata".to_string(),
            elapsed: None,
        });
        let fresh = EmMetadata::from_tiles(&tiles)?;
        sink.event(ProgressEvent {
            message: format!("phase=Metadata; {} slices", fresh.number_slices),
            elapsed: Some(start.elapsed()),
        });

        let blob = em_metadata_blob_name(dataset);
        let mut merged_with_remote = false;
        let mut remote_discarded = false;
        let metadata = match storage.get_blob(&blob)? {
            Some(content) => match EmMetadata::from_json(&content) {
                Ok(persisted) => {
                    merged_with_remote = true;
                    persisted.merge(&fresh)
                }
                Err(err) => {
                    tracing::warn!("remote EM tiles metadata is malformed and will be overwritten: {err}");
                    remote_discarded = true;
                    fresh
                }
            },
            None => fresh,
        };

        let local_dir = tiles_root(&tiles).unwrap_or_else(|| {
            let fallback = self.store.config_root().to_path_buf();
            tracing::warn!("found multiple root parents of the EM tiles, will save metadata in {fallback}");
            fallback
        });
        let local_path = local_dir.join("metadata.json");
        let content = metadata.to_json()?;
        if options.dry_run {
            tracing::info!("EM tiles metadata will be saved in {local_path} and uploaded as {blob}");
        } else {
            tracing::info!("saving EM tiles metadata in {local_path}");
            Store::write_bytes_atomic(&local_path, &content)?;
        }

        sink.event(ProgressEvent {
            message: format!("phase=Upload; {blob}"),
            elapsed: None,
        });
        // merged metadata always supersedes the published copy
        let action = storage.upload_bytes(&content, &blob, true)?;

        let mut tile_uploads = UploadSummary::default();
        let start = Instant::now();
        for tile in &tiles {
            let tile_blob = em_tile_blob_name(dataset, tile);
            tile_uploads.record(storage.upload(tile.path(), &tile_blob, options.overwrite)?);
        }
        sink.event(ProgressEvent {
            message: format!(
                "phase=Upload; tiles uploaded={} skipped={}",
                tile_uploads.uploaded, tile_uploads.skipped
            ),
            elapsed: Some(start.elapsed()),
        });

        Ok(IngestResult {
            dataset: dataset.to_string(),
            dry_run: options.dry_run,
            tiles: tiles.len(),
            metadata: Some(MetadataUpload {
                number_slices: metadata.number_slices,
                slice_range: metadata.slice_range,
                merged_with_remote,
                remote_discarded,
                local_path: local_path.to_string(),
                blob,
                action,
            }),
            tile_uploads,
            finished_at: iso_timestamp(),
        })
    }

    pub fn ingest_segmentations(
        &self,
        dataset: &DatasetId,
        paths: &[Utf8PathBuf],
        options: IngestOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SegmentationResult, IngestError> {
        let storage = RemoteStorage::new(&self.bucket, options.dry_run);

        sink.event(ProgressEvent {
            message: "phase=Discover; scanning segmentation files".to_string(),
            elapsed: None,
        });
        let found = find_segmentation_files(paths)?;

        let mut uploads = UploadSummary::default();
        if found.files.is_empty() {
            tracing::warn!("skipping segmentation upload: no files found");
        } else {
            let start = Instant::now();
            for file in &found.files {
                let blob = segmentation_blob_name(dataset, file.slice);
                uploads.record(storage.upload(&file.path, &blob, options.overwrite)?);
            }
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Upload; segmentations uploaded={} skipped={}",
                    uploads.uploaded, uploads.skipped
                ),
                elapsed: Some(start.elapsed()),
            });
        }

        let resolutions = match (&found.resolutions, found.files.is_empty()) {
            (_, true) => None,
            (None, false) => {
                tracing::warn!("skipping segmentation resolutions metadata upload: no files found");
                None
            }
            (Some(path), false) => {
                let content = std::fs::read(path.as_std_path())
                    .map_err(|err| IngestError::Filesystem(format!("read {path}: {err}")))?;
                SegmentationMetadata::from_json(&content)?;
                let blob = segmentation_metadata_blob_name(dataset);
                sink.event(ProgressEvent {
                    message: format!("phase=Upload; {blob}"),
                    elapsed: None,
                });
                Some(storage.upload_bytes(&content, &blob, options.overwrite)?)
            }
        };

        Ok(SegmentationResult {
            dataset: dataset.to_string(),
            dry_run: options.dry_run,
            files: found.files.len(),
            uploads,
            resolutions,
            finished_at: iso_timestamp(),
        })
    }

    pub fn viewer_config(
        &self,
        dataset: &DatasetId,
        sink: &dyn ProgressSink,
    ) -> Result<ViewerConfig, IngestError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; viewer configuration for {dataset}"),
            elapsed: None,
        });

        let content = self
            .bucket
            .get_blob(&em_metadata_blob_name(dataset))?
            .ok_or_else(|| IngestError::MetadataNotFound(dataset.to_string()))?;
        let em = EmMetadata::from_json(&content)?;

        let segmentation = self
            .bucket
            .get_blob(&segmentation_metadata_blob_name(dataset))?
            .map(|content| SegmentationMetadata::from_json(&content))
            .transpose()?;

        ViewerConfig::resolve(dataset, &em, segmentation.as_ref(), &self.config.templates)
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
