use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use celegans_ingestion::app::{App, IngestOptions, ProgressSink};
use celegans_ingestion::bucket::LocalBucket;
use celegans_ingestion::config::{ConfigLoader, ResolvedConfig};
use celegans_ingestion::domain::DatasetId;
use celegans_ingestion::error::IngestError;
use celegans_ingestion::output::{JsonOutput, LogSink, OutputMode};
use celegans_ingestion::store::Store;

#[derive(Parser)]
#[command(name = "celegans-ingest")]
#[command(about = "Compute EM tile pyramid metadata and publish C. elegans datasets")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, help = "print JSON summaries instead of progress logs")]
    non_interactive: bool,

    #[arg(long, global = true, help = "run with debug logs")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Compute EM tiles metadata and print it as JSON")]
    Metadata(MetadataArgs),
    #[command(about = "Compute, merge and upload EM tiles metadata and tiles")]
    Ingest(IngestArgs),
    #[command(about = "Show the viewer configuration of an ingested dataset")]
    ViewerConfig(ViewerConfigArgs),
}

#[derive(Args)]
struct MetadataArgs {
    #[arg(required = true, help = "directory or files with EM tiles")]
    em_paths: Vec<Utf8PathBuf>,

    #[arg(long, help = "indentation to use in the JSON output")]
    indent: Option<usize>,
}

#[derive(Args)]
struct BucketArgs {
    #[arg(long, help = "bucket directory (envvar: C_ELEGANS_BUCKET)")]
    bucket: Option<Utf8PathBuf>,

    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct IngestArgs {
    #[arg(long, help = "dataset identifier for the ingested files")]
    id: String,

    #[arg(
        short,
        long,
        num_args = 1..,
        required_unless_present = "segmentation",
        help = "directory or files with EM tiles"
    )]
    em: Vec<Utf8PathBuf>,

    #[arg(long, num_args = 1.., help = "directory or s<slice>.json segmentation files")]
    segmentation: Vec<Utf8PathBuf>,

    #[arg(
        long,
        help = "overwrite files in the bucket (the merged EM metadata is always republished)"
    )]
    overwrite: bool,

    #[arg(long, help = "show what would have been uploaded and where")]
    dry_run: bool,

    #[command(flatten)]
    bucket: BucketArgs,
}

#[derive(Args)]
struct ViewerConfigArgs {
    #[arg(long, help = "dataset identifier")]
    id: String,

    #[command(flatten)]
    bucket: BucketArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<IngestError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngestError) -> u8 {
    match error {
        IngestError::MalformedTileName { .. }
        | IngestError::UnsupportedTileFormat(_)
        | IngestError::TileDecode { .. }
        | IngestError::InconsistentTileSize { .. }
        | IngestError::MixedZoomLevels { .. }
        | IngestError::MixedSlices { .. }
        | IngestError::MissingSlice(_)
        | IngestError::TileGridTooLarge { .. }
        | IngestError::MalformedSegmentationName { .. }
        | IngestError::EmptyTileGrid
        | IngestError::EmptyTileSet => 2,
        IngestError::MetadataNotFound(_) => 2,
        IngestError::Storage { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Interactive => &LogSink,
        OutputMode::NonInteractive => &JsonOutput,
    };

    let store = Store::new()?;

    match cli.command {
        Commands::Metadata(args) => {
            let config = ConfigLoader::resolve(None)?;
            let app = build_app(store, &config, None);
            let metadata = app.compute_metadata(&args.em_paths, sink)?;
            JsonOutput::print_metadata(&metadata, args.indent).into_diagnostic()
        }
        Commands::Ingest(args) => {
            let dataset: DatasetId = args.id.parse()?;
            let config = ConfigLoader::resolve(args.bucket.config.as_deref())?;
            let app = build_app(store, &config, args.bucket.bucket);
            let options = IngestOptions {
                overwrite: args.overwrite,
                dry_run: args.dry_run,
            };
            let em = if args.em.is_empty() {
                tracing::info!("skipping EM tiles upload: flag not set");
                None
            } else {
                Some(app.ingest_em(&dataset, &args.em, options, sink)?)
            };
            let segmentation = if args.segmentation.is_empty() {
                tracing::info!("skipping segmentation upload: flag not set");
                None
            } else {
                Some(app.ingest_segmentations(&dataset, &args.segmentation, options, sink)?)
            };
            match output_mode {
                OutputMode::NonInteractive => {
                    JsonOutput::print_ingest(em.as_ref(), segmentation.as_ref()).into_diagnostic()
                }
                OutputMode::Interactive => {
                    let verb = if options.dry_run {
                        "upload simulation for"
                    } else {
                        "uploading"
                    };
                    tracing::info!("==> Done {verb} dataset '{dataset}'!");
                    Ok(())
                }
            }
        }
        Commands::ViewerConfig(args) => {
            let dataset: DatasetId = args.id.parse()?;
            let config = ConfigLoader::resolve(args.bucket.config.as_deref())?;
            let app = build_app(store, &config, args.bucket.bucket);
            let viewer = app.viewer_config(&dataset, sink)?;
            JsonOutput::print_viewer_config(&viewer).into_diagnostic()
        }
    }
}

fn build_app(
    store: Store,
    config: &ResolvedConfig,
    bucket_override: Option<Utf8PathBuf>,
) -> App<LocalBucket> {
    let bucket_dir = bucket_override
        .or_else(|| config.bucket.clone())
        .unwrap_or_else(|| store.default_bucket_dir());
    tracing::debug!(bucket = %bucket_dir, "using local bucket");
    App::new(store, LocalBucket::new(bucket_dir), config.clone())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overwrite_help_mentions_metadata_republishing() {
        let command = Cli::command();
        let ingest = command.find_subcommand("ingest").unwrap();
        let overwrite = ingest
            .get_arguments()
            .find(|arg| arg.get_id() == "overwrite")
            .unwrap();
        let help = overwrite.get_help().unwrap().to_string();
        assert!(help.contains("EM metadata is always republished"));
    }

    #[test]
    fn ingest_accepts_segmentation_without_em() {
        let cli = Cli::try_parse_from([
            "celegans-ingest",
            "ingest",
            "--id",
            "ds",
            "--segmentation",
            "seg/s1.json",
            "seg/s2.json",
        ])
        .unwrap();
        let Commands::Ingest(args) = cli.command else {
            panic!("expected the ingest command");
        };
        assert!(args.em.is_empty());
        assert_eq!(args.segmentation.len(), 2);

        assert!(Cli::try_parse_from(["celegans-ingest", "ingest", "--id", "ds"]).is_err());
    }
}
