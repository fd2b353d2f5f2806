use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::viewer::UrlTemplates;

pub const CONFIG_FILE: &str = "celegans-ingest.json";
pub const BUCKET_ENV: &str = "C_ELEGANS_BUCKET";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub resource_url_format: Option<String>,
    #[serde(default)]
    pub segmentation_url_format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub bucket: Option<Utf8PathBuf>,
    pub templates: UrlTemplates,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IngestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| IngestError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| IngestError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(bucket) = std::env::var(BUCKET_ENV) {
            if !bucket.trim().is_empty() {
                resolved.bucket = Some(Utf8PathBuf::from(bucket.trim()));
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IngestError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(IngestError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let defaults = UrlTemplates::default();
        let templates = UrlTemplates {
            resource: config.resource_url_format.unwrap_or(defaults.resource),
            segmentation: config
                .segmentation_url_format
                .unwrap_or(defaults.segmentation),
        };

        Ok(ResolvedConfig {
            schema_version,
            bucket: config.bucket.map(Utf8PathBuf::from),
            templates,
        })
    }
}
