use std::io::{self, Write};

use serde::Serialize;

use crate::app::{IngestResult, ProgressEvent, ProgressSink, SegmentationResult};
use crate::em_metadata::EmMetadata;
use crate::viewer::ViewerConfig;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_metadata(metadata: &EmMetadata, indent: Option<usize>) -> io::Result<()> {
        let json = match indent {
            Some(indent) => metadata.to_json_pretty(indent),
            None => metadata.to_json(),
        }
        .map_err(io::Error::other)?;
        Self::write_line(&json)
    }

    pub fn print_ingest(
        em: Option<&IngestResult>,
        segmentation: Option<&SegmentationResult>,
    ) -> io::Result<()> {
        #[derive(Serialize)]
        struct DatasetIngest<'a> {
            em: Option<&'a IngestResult>,
            segmentation: Option<&'a SegmentationResult>,
        }
        Self::print_json(&DatasetIngest { em, segmentation })
    }

    pub fn print_viewer_config(config: &ViewerConfig) -> io::Result<()> {
        Self::print_json(config)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
        Self::write_line(&json)
    }

    fn write_line(content: &[u8]) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(content)?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}
