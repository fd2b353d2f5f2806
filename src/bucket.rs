use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::DatasetId;
use crate::error::IngestError;
use crate::store::Store;
use crate::tile::Tile;

pub trait Bucket {
    fn name(&self) -> &str;
    fn get_blob(&self, blob_name: &str) -> Result<Option<Vec<u8>>, IngestError>;
    fn put_blob(&self, blob_name: &str, content: &[u8]) -> Result<(), IngestError>;
}

impl<B: Bucket + ?Sized> Bucket for &B {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get_blob(&self, blob_name: &str) -> Result<Option<Vec<u8>>, IngestError> {
        (**self).get_blob(blob_name)
    }

    fn put_blob(&self, blob_name: &str, content: &[u8]) -> Result<(), IngestError> {
        (**self).put_blob(blob_name, content)
    }
}

#[derive(Debug, Clone)]
pub struct LocalBucket {
    name: String,
    root: Utf8PathBuf,
}

impl LocalBucket {
    pub fn new(root: Utf8PathBuf) -> Self {
        let name = root.file_name().unwrap_or("bucket").to_string();
        Self { name, root }
    }

    fn blob_path(&self, blob_name: &str) -> Result<Utf8PathBuf, IngestError> {
        let relative = Utf8Path::new(blob_name);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, camino::Utf8Component::ParentDir));
        if blob_name.is_empty() || escapes {
            return Err(IngestError::Storage {
                bucket: self.name.clone(),
                message: format!("invalid blob name: {blob_name}"),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl Bucket for LocalBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_blob(&self, blob_name: &str) -> Result<Option<Vec<u8>>, IngestError> {
        Store::read_bytes(&self.blob_path(blob_name)?)
    }

    fn put_blob(&self, blob_name: &str, content: &[u8]) -> Result<(), IngestError> {
        Store::write_bytes_atomic(&self.blob_path(blob_name)?, content)
    }
}

pub fn em_metadata_blob_name(dataset: &DatasetId) -> String {
    format!("{dataset}/em/metadata.json")
}

pub fn em_tile_blob_name(dataset: &DatasetId, tile: &Tile) -> String {
    let file_name = tile.path().file_name().unwrap_or_default();
    match tile.slice() {
        Some(slice) => format!("{dataset}/em/{slice}/{file_name}"),
        None => format!("{dataset}/em/{file_name}"),
    }
}

pub fn segmentation_blob_name(dataset: &DatasetId, slice: u32) -> String {
    format!("{dataset}/segmentations/s{slice}.json")
}

pub fn segmentation_metadata_blob_name(dataset: &DatasetId) -> String {
    format!("{dataset}/segmentations/metadata.json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadAction {
    Uploaded,
    Skipped,
    DryRun,
}

pub struct RemoteStorage<B: Bucket> {
    bucket: B,
    dry_run: bool,
}

impl<B: Bucket> RemoteStorage<B> {
    pub fn new(bucket: B, dry_run: bool) -> Self {
        Self { bucket, dry_run }
    }

    pub fn get_blob(&self, blob_name: &str) -> Result<Option<Vec<u8>>, IngestError> {
        self.bucket.get_blob(blob_name)
    }

    pub fn upload(
        &self,
        source: &Utf8Path,
        blob_name: &str,
        overwrite: bool,
    ) -> Result<UploadAction, IngestError> {
        let content = std::fs::read(source.as_std_path())
            .map_err(|err| IngestError::Filesystem(format!("read {source}: {err}")))?;
        self.upload_bytes(&content, blob_name, overwrite)
    }

    pub fn upload_bytes(
        &self,
        content: &[u8],
        blob_name: &str,
        overwrite: bool,
    ) -> Result<UploadAction, IngestError> {
        let bucket = self.bucket.name();
        match self.bucket.get_blob(blob_name)? {
            None if self.dry_run => {
                tracing::debug!("dryrun: remote blob doesn't exist: would upload {bucket}://{blob_name}");
                return Ok(UploadAction::DryRun);
            }
            None => {}
            Some(existing) => {
                if existing == content || !overwrite {
                    tracing::debug!("skipping {blob_name}: already in the bucket");
                    return Ok(UploadAction::Skipped);
                }
                if self.dry_run {
                    tracing::debug!(
                        "dryrun: remote blob differs: would overwrite {bucket}://{blob_name}"
                    );
                    return Ok(UploadAction::DryRun);
                }
            }
        }

        self.bucket.put_blob(blob_name, content)?;
        Ok(UploadAction::Uploaded)
    }
}
