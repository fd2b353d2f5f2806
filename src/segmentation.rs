use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::error::IngestError;
use crate::store::walk_dir;

pub const RESOLUTIONS_METADATA_FILE: &str = "metadata.json";

fn segmentation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"s(\d+)\.json$").expect("valid segmentation regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationFile {
    pub slice: u32,
    pub path: Utf8PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentationFiles {
    pub files: Vec<SegmentationFile>,
    pub resolutions: Option<Utf8PathBuf>,
}

fn is_resolutions_metadata(path: &Utf8Path) -> bool {
    path.file_name() == Some(RESOLUTIONS_METADATA_FILE)
}

pub fn parse_segmentation_path(path: &Utf8Path) -> Result<SegmentationFile, IngestError> {
    let malformed = |reason: String| IngestError::MalformedSegmentationName {
        path: path.as_std_path().to_path_buf(),
        reason,
    };
    let name = path
        .file_name()
        .ok_or_else(|| malformed("missing file name".to_string()))?;
    let captures = segmentation_regex()
        .captures(name)
        .ok_or_else(|| malformed("unable to extract the slice number".to_string()))?;
    let slice = captures[1]
        .parse()
        .map_err(|_| malformed(format!("slice '{}' is out of range", &captures[1])))?;
    Ok(SegmentationFile {
        slice,
        path: path.to_path_buf(),
    })
}

pub fn find_segmentation_files(paths: &[Utf8PathBuf]) -> Result<SegmentationFiles, IngestError> {
    let mut found = SegmentationFiles::default();

    match paths {
        [dir] if dir.as_std_path().is_dir() => {
            for path in walk_dir(dir.as_std_path())? {
                let path = Utf8PathBuf::from_path_buf(path).map_err(|path| {
                    IngestError::Filesystem(format!(
                        "non-utf8 segmentation path: {}",
                        path.display()
                    ))
                })?;
                if !path.as_std_path().is_file() || path.extension() != Some("json") {
                    continue;
                }
                if is_resolutions_metadata(&path) {
                    if path.parent() == Some(dir.as_path()) {
                        found.resolutions = Some(path);
                    }
                    continue;
                }
                found.files.push(parse_segmentation_path(&path)?);
            }
        }
        _ => {
            for path in paths {
                if is_resolutions_metadata(path) {
                    found.resolutions = Some(path.clone());
                } else if segmentation_regex().is_match(path.as_str()) {
                    found.files.push(parse_segmentation_path(path)?);
                }
            }
        }
    }

    found.files.sort_by(|a, b| a.slice.cmp(&b.slice).then_with(|| a.path.cmp(&b.path)));
    tracing::debug!(count = found.files.len(), "discovered segmentation files");
    Ok(found)
}
