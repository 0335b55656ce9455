//! CLI argument definitions.

use crate::cli::validators::{parse_pixels, parse_probability, parse_threshold};
use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tile georeferenced rasters for object-detection training and inference.
#[derive(Debug, Parser)]
#[command(name = "geotiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by all subcommands.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cut a raster into training tiles with YOLO labels.
    Dataset(DatasetArgs),
    /// Detect objects over a raster and write georeferenced results.
    Detect(DetectArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Options accepted by every subcommand.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalArgs {
    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "GEOTILER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Spatial reference of the raster (e.g. EPSG:25830).
    #[arg(long, global = true, env = "GEOTILER_CRS")]
    pub crs: Option<String>,

    /// Stop on the first tile error instead of skipping the tile.
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Disable progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Tile layout overrides.
#[derive(Debug, Args)]
pub struct TilingArgs {
    /// Tile edge length in pixels.
    #[arg(long, value_parser = parse_pixels, env = "GEOTILER_PATCH_SIZE")]
    pub patch_size: Option<u32>,

    /// Distance between tile origins in pixels.
    #[arg(long, value_parser = parse_pixels, env = "GEOTILER_STRIDE")]
    pub stride: Option<u32>,
}

/// Arguments for the dataset command.
#[derive(Debug, Args)]
pub struct DatasetArgs {
    /// Georeferenced raster with a world file sidecar.
    pub raster: PathBuf,

    /// GeoJSON annotations.
    #[arg(short, long)]
    pub annotations: PathBuf,

    /// Output directory receiving `images/` and `labels/`.
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Tile layout overrides.
    #[command(flatten)]
    pub tiling: TilingArgs,

    /// Probability of keeping a tile with no annotations (0.0-1.0).
    #[arg(short = 'p', long, value_parser = parse_probability, env = "GEOTILER_EMPTY_PROBABILITY")]
    pub empty_probability: Option<f64>,

    /// Seed for empty-tile sampling.
    #[arg(long, env = "GEOTILER_SEED")]
    pub seed: Option<u64>,

    /// Annotation property holding the class value.
    #[arg(long, env = "GEOTILER_CLASS_FIELD")]
    pub class_field: Option<String>,

    /// Accepted class values (comma-separated); order gives the class id.
    #[arg(long, value_delimiter = ',', env = "GEOTILER_CLASS_VALUES")]
    pub class_values: Option<Vec<String>>,
}

/// Arguments for the detect command.
#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Georeferenced raster with a world file sidecar.
    pub raster: PathBuf,

    /// ONNX model (overrides config).
    #[arg(short, long, env = "GEOTILER_MODEL")]
    pub model: Option<PathBuf>,

    /// Output file; with several formats the extension is replaced per format.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output formats (comma-separated: geojson,csv).
    #[arg(short, long, value_delimiter = ',', env = "GEOTILER_FORMAT")]
    pub format: Option<Vec<OutputFormat>>,

    /// Tile layout overrides.
    #[command(flatten)]
    pub tiling: TilingArgs,

    /// Minimum detector confidence (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_threshold, env = "GEOTILER_CONFIDENCE")]
    pub confidence: Option<f32>,

    /// IoU above which cross-tile duplicates are suppressed (0.0-1.0).
    #[arg(long, value_parser = parse_threshold, env = "GEOTILER_IOU")]
    pub iou: Option<f32>,

    /// IoU for the detector's own per-tile suppression (0.0-1.0).
    #[arg(long, value_parser = parse_threshold)]
    pub detector_iou: Option<f32>,

    /// Class names by class id (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub class_names: Option<Vec<String>>,
}
