//! Geotiler - tiling and cross-tile detection for georeferenced rasters.
//!
//! This crate cuts large georeferenced rasters into overlapping tiles for
//! object-detection training (tiles plus YOLO labels) and runs a detector
//! over every tile, merging the results into deduplicated geographic
//! features.

#![warn(missing_docs)]

pub mod annotation;
pub mod cli;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod geo;
pub mod output;
pub mod pipeline;
pub mod raster;
pub mod tiling;

use clap::Parser;
use cli::{Cli, Command, DatasetArgs, DetectArgs, GlobalArgs, TilingArgs};
use config::{
    Config, config_file_path, load_config_file, load_default_config, save_default_config,
    validate_config,
};
use detection::OnnxDetector;
use crate::geo::SpatialRef;
use output::{output_path_for, write_features};
use pipeline::{CancelToken, DatasetOptions, InferenceOptions, create_dataset, run_detection};
use raster::open_raster;
use std::path::Path;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for geotiler CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet);

    match cli.command {
        Command::Config { action } => handle_config_command(action, cli.global.config.as_deref()),
        Command::Dataset(args) => {
            let config = load_config(&cli.global)?;
            let cancel = install_cancel_handler();
            run_dataset(&args, &cli.global, config, &cancel)
        }
        Command::Detect(args) => {
            let config = load_config(&cli.global)?;
            let cancel = install_cancel_handler();
            run_detect(&args, &cli.global, config, &cancel)
        }
    }
}

/// Cancel the current run between tiles on Ctrl+C.
fn install_cancel_handler() -> CancelToken {
    let token = CancelToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the current tiles");
        handler_token.cancel();
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
    token
}

fn load_config(global: &GlobalArgs) -> Result<Config> {
    global
        .config
        .as_deref()
        .map_or_else(load_default_config, load_config_file)
}

fn apply_tiling_overrides(config: &mut Config, args: &TilingArgs) {
    if let Some(patch_size) = args.patch_size {
        config.tiling.patch_size = patch_size;
    }
    if let Some(stride) = args.stride {
        config.tiling.stride = stride;
    }
}

fn raster_spatial_ref(global: &GlobalArgs) -> Option<SpatialRef> {
    global.crs.as_deref().map(SpatialRef::parse)
}

fn run_dataset(
    args: &DatasetArgs,
    global: &GlobalArgs,
    mut config: Config,
    cancel: &CancelToken,
) -> Result<()> {
    apply_tiling_overrides(&mut config, &args.tiling);
    if let Some(p) = args.empty_probability {
        config.dataset.empty_keep_probability = p;
    }
    if let Some(seed) = args.seed {
        config.dataset.seed = Some(seed);
    }
    if let Some(field) = &args.class_field {
        config.dataset.class_field.clone_from(field);
    }
    if let Some(values) = &args.class_values {
        config.dataset.class_values.clone_from(values);
    }
    validate_config(&config)?;

    let raster = open_raster(&args.raster, raster_spatial_ref(global))?;
    let annotations = annotation::load_geojson(
        &args.annotations,
        &config.dataset.class_field,
        &config.dataset.class_values,
    )?;

    let options = DatasetOptions {
        output_dir: args.output_dir.clone(),
        tiling: config.tiling,
        empty_keep_probability: config.dataset.empty_keep_probability,
        seed: config.dataset.seed,
        progress: !global.quiet && !global.no_progress,
        fail_fast: global.fail_fast,
    };
    let summary = create_dataset(raster.as_ref(), &annotations, &options, cancel)?;

    // Summary
    info!(
        "Complete: {} annotated + {} empty tile(s) of {} written, {} label(s), {} skipped in {:.2}s",
        summary.annotated_tiles,
        summary.empty_tiles,
        summary.tiles_total,
        summary.labels_written,
        summary.tiles_skipped,
        summary.duration_secs
    );
    info!(
        "Dataset written to {} (seed {})",
        args.output_dir.display(),
        summary.seed
    );
    if summary.degenerate_labels > 0 {
        info!(
            "{} annotation match(es) clipped to zero area were not labelled",
            summary.degenerate_labels
        );
    }
    if summary.tiles_skipped > 0 {
        warn!("{} tile(s) had errors", summary.tiles_skipped);
    }

    Ok(())
}

fn run_detect(
    args: &DetectArgs,
    global: &GlobalArgs,
    mut config: Config,
    cancel: &CancelToken,
) -> Result<()> {
    apply_tiling_overrides(&mut config, &args.tiling);
    let inference = &mut config.inference;
    if let Some(c) = args.confidence {
        inference.confidence_threshold = c;
    }
    if let Some(iou) = args.iou {
        inference.iou_threshold = iou;
    }
    if let Some(iou) = args.detector_iou {
        inference.detector_iou_threshold = iou;
    }
    if let Some(names) = &args.class_names {
        inference.class_names.clone_from(names);
    }
    if let Some(formats) = &args.format {
        inference.formats.clone_from(formats);
    }
    if let Some(model) = &args.model {
        inference.model = Some(model.clone());
    }
    validate_config(&config)?;

    let model = config
        .inference
        .model
        .clone()
        .ok_or_else(|| Error::ConfigValidation {
            message: "no model specified (use -m or set inference.model in config)".to_string(),
        })?;

    let raster = open_raster(&args.raster, raster_spatial_ref(global))?;
    let detector = OnnxDetector::from_file(
        &model,
        config.tiling.patch_size,
        config.inference.detector_iou_threshold,
    )?;

    let options = InferenceOptions {
        tiling: config.tiling,
        confidence_threshold: config.inference.confidence_threshold,
        iou_threshold: config.inference.iou_threshold,
        class_names: config.inference.class_names.clone(),
        progress: !global.quiet && !global.no_progress,
        fail_fast: global.fail_fast,
    };
    let result = run_detection(raster.as_ref(), &detector, &options, cancel)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OutputWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let formats = &config.inference.formats;
    for &format in formats {
        let path = output_path_for(&args.output, format, formats.len());
        write_features(
            &path,
            format,
            &result.features,
            raster.extent().spatial_ref.as_ref(),
        )?;
        info!("Wrote {} feature(s) to {}", result.features.len(), path.display());
    }

    // Summary
    let summary = &result.summary;
    info!(
        "Complete: {} tile(s) processed, {} skipped, {} raw detection(s), {} kept in {:.2}s",
        summary.tiles_processed,
        summary.tiles_skipped,
        summary.raw_detections,
        summary.kept_detections,
        summary.duration_secs
    );
    if summary.tiles_processed > 0 {
        #[allow(clippy::cast_precision_loss)]
        let tiles_per_sec = if summary.duration_secs > 0.0 {
            summary.tiles_processed as f64 / summary.duration_secs
        } else {
            0.0
        };
        info!("Performance: {tiles_per_sec:.1} tiles/sec");
    }
    if summary.tiles_skipped > 0 {
        warn!("{} tile(s) had errors", summary.tiles_skipped);
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed unless asked for with -v.
    let filter_str = if quiet {
        "warn,ort=off"
    } else {
        match verbose {
            0 => "info,ort=off",
            1 => "debug,ort=warn",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).init();
}

fn handle_config_command(action: cli::ConfigAction, explicit: Option<&Path>) -> Result<()> {
    use cli::ConfigAction;

    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = if explicit.is_some() {
                    config::save_config(&config, &path)?;
                    path
                } else {
                    save_default_config(&config)?
                };
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config_file(&path)?;
            let contents =
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{contents}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
