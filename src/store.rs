use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::error::IngestError;

#[derive(Debug, Clone)]
pub struct Store {
    config_root: Utf8PathBuf,
    data_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, IngestError> {
        let dirs = BaseDirs::new().ok_or_else(|| {
            IngestError::Filesystem("unable to resolve home directories".to_string())
        })?;
        let config_root = Utf8PathBuf::from_path_buf(dirs.config_dir().join("celegans"))
            .map_err(|_| IngestError::Filesystem("invalid config directory".to_string()))?;
        let data_root = Utf8PathBuf::from_path_buf(dirs.data_dir().join("celegans"))
            .map_err(|_| IngestError::Filesystem("invalid data directory".to_string()))?;

        Ok(Self {
            config_root,
            data_root,
        })
    }

    pub fn new_with_paths(config_root: Utf8PathBuf, data_root: Utf8PathBuf) -> Self {
        Self {
            config_root,
            data_root,
        }
    }

    pub fn config_root(&self) -> &Utf8Path {
        &self.config_root
    }

    pub fn default_bucket_dir(&self) -> Utf8PathBuf {
        self.data_root.join("bucket")
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), IngestError> {
        let parent = path
            .parent()
            .ok_or_else(|| IngestError::Filesystem(format!("invalid destination path: {path}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix(".celegans-write")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| IngestError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn read_bytes(path: &Utf8Path) -> Result<Option<Vec<u8>>, IngestError> {
        match fs::read(path.as_std_path()) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(IngestError::Filesystem(format!("read {path}: {err}"))),
        }
    }
}

pub(crate) fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path)
            .map_err(|err| IngestError::Filesystem(format!("read {}: {err}", path.display())))?;
        for entry in entries {
            let entry = entry.map_err(|err| IngestError::Filesystem(err.to_string()))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|err| IngestError::Filesystem(format!("stat {}: {err}", path.display())))?;
            if file_type.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}
