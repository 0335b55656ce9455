//! Tiled detection over a whole raster.

use crate::config::TilingConfig;
use crate::detection::{Deduplicator, DetectionRunner, Detector, GlobalAssembler};
use crate::error::{Error, Result};
use crate::output::GeoFeature;
use crate::output::progress::{create_tile_progress, finish_progress, inc_progress};
use crate::pipeline::CancelToken;
use crate::raster::RasterSource;
use crate::tiling::{Tile, TileGrid, TilePolicy};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for one detection run.
#[derive(Debug, Clone)]
pub struct InferenceOptions {
    /// Tile layout.
    pub tiling: TilingConfig,
    /// Minimum detector confidence.
    pub confidence_threshold: f32,
    /// IoU above which cross-tile duplicates are suppressed.
    pub iou_threshold: f32,
    /// Class names by class id.
    pub class_names: Vec<String>,
    /// Show a progress bar.
    pub progress: bool,
    /// Abort on the first tile error instead of skipping the tile.
    pub fail_fast: bool,
}

/// Counts reported after a detection run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceSummary {
    /// Tiles in the inference grid.
    pub tiles_total: usize,
    /// Tiles the detector ran on.
    pub tiles_processed: usize,
    /// Tiles skipped because of a tile error.
    pub tiles_skipped: usize,
    /// Detections before deduplication.
    pub raw_detections: usize,
    /// Zero-area boxes dropped during assembly.
    pub degenerate_boxes: usize,
    /// Detections kept after deduplication.
    pub kept_detections: usize,
    /// Wall time in seconds.
    pub duration_secs: f64,
}

/// Deduplicated features and run counts.
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    /// Kept detections as geographic features, highest confidence first.
    pub features: Vec<GeoFeature>,
    /// Run counts.
    pub summary: InferenceSummary,
}

/// Per-worker state, merged at the end of the parallel pass.
#[derive(Debug, Default)]
struct TileAccumulator {
    assembler: GlobalAssembler,
    processed: usize,
    skipped: usize,
}

impl TileAccumulator {
    fn merge(self, other: Self) -> Self {
        Self {
            assembler: self.assembler.merge(other.assembler),
            processed: self.processed + other.processed,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Detect objects over a raster and suppress cross-tile duplicates.
///
/// Tiles cover the whole raster (edge tiles are zero-padded). Suppression
/// runs only once every tile has been assembled. A cancelled run returns
/// [`Error::Interrupted`] and produces no output; a run where every tile
/// failed returns [`Error::NoTilesProcessed`].
pub fn run_detection(
    source: &dyn RasterSource,
    detector: &dyn Detector,
    options: &InferenceOptions,
    cancel: &CancelToken,
) -> Result<DetectionOutput> {
    let start = Instant::now();
    let extent = source.extent();
    let mapper = extent.mapper()?;

    let grid = TileGrid::new(
        extent.width,
        extent.height,
        options.tiling.patch_size,
        options.tiling.stride,
        TilePolicy::Inference,
    );
    let tiles: Vec<Tile> = grid.tiles().collect();
    info!(
        "Running '{}' on {} tile(s) of {}px, stride {}",
        detector.name(),
        tiles.len(),
        options.tiling.patch_size,
        options.tiling.stride
    );

    let runner = DetectionRunner::new(detector, options.confidence_threshold);
    let pb = create_tile_progress(tiles.len(), detector.name(), options.progress);

    let result = tiles
        .par_iter()
        .try_fold(TileAccumulator::default, |mut acc, tile| {
            if cancel.is_cancelled() {
                return Err(Error::Interrupted);
            }
            match runner.run_tile(source, tile) {
                Ok(raw) => {
                    acc.assembler.add_tile(raw);
                    acc.processed += 1;
                }
                Err(e) if e.is_tile_local() && !options.fail_fast => {
                    warn!("Skipping tile ({}, {}): {e}", tile.x, tile.y);
                    acc.skipped += 1;
                }
                Err(e) => return Err(e),
            }
            inc_progress(pb.as_ref());
            Ok(acc)
        })
        .try_reduce(TileAccumulator::default, |a, b| Ok(a.merge(b)));
    finish_progress(pb, "Inference complete");
    let acc = result?;

    if cancel.is_cancelled() {
        return Err(Error::Interrupted);
    }
    if acc.processed == 0 && acc.skipped > 0 {
        return Err(Error::NoTilesProcessed {
            skipped: acc.skipped,
        });
    }

    let degenerate_boxes = acc.assembler.degenerate();
    if degenerate_boxes > 0 {
        warn!("Dropped {degenerate_boxes} zero-area detection box(es)");
    }

    let detections = acc.assembler.finish();
    let raw_detections = detections.len();
    let kept = Deduplicator::new(options.iou_threshold).run(detections);
    debug!(
        "Deduplicated {raw_detections} detection(s) to {} at IoU {}",
        kept.len(),
        options.iou_threshold
    );

    let features: Vec<GeoFeature> = kept
        .iter()
        .map(|d| GeoFeature::from_detection(d, &mapper, &options.class_names))
        .collect();

    Ok(DetectionOutput {
        summary: InferenceSummary {
            tiles_total: tiles.len(),
            tiles_processed: acc.processed,
            tiles_skipped: acc.skipped,
            raw_detections,
            degenerate_boxes,
            kept_detections: features.len(),
            duration_secs: start.elapsed().as_secs_f64(),
        },
        features,
    })
}
