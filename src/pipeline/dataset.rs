//! Training dataset generation.

use crate::annotation::{AnnotationProjector, AnnotationSet, EmptyTileSampler, TileLabels};
use crate::config::TilingConfig;
use crate::constants::dataset::{
    IMAGE_EXTENSION, IMAGES_DIR, LABEL_EXTENSION, LABELS_DIR, TILE_PREFIX,
};
use crate::detection::to_rgb;
use crate::error::{Error, Result};
use crate::output::progress::{create_tile_progress, finish_progress, inc_progress};
use crate::output::write_label_file;
use crate::pipeline::CancelToken;
use crate::raster::{PixelWindow, RasterSource};
use crate::tiling::{Tile, TileGrid, TilePolicy};
use image::{DynamicImage, GrayImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for one dataset run.
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    /// Root directory receiving `images/` and `labels/`.
    pub output_dir: PathBuf,
    /// Tile layout.
    pub tiling: TilingConfig,
    /// Probability of keeping a tile with no annotations.
    pub empty_keep_probability: f64,
    /// Sampling seed; drawn at random when `None`.
    pub seed: Option<u64>,
    /// Show a progress bar.
    pub progress: bool,
    /// Abort on the first tile error instead of skipping the tile.
    pub fail_fast: bool,
}

/// Counts reported after a dataset run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    /// Full-size tiles in the training grid.
    pub tiles_total: usize,
    /// Tiles written with at least one matched annotation.
    pub annotated_tiles: usize,
    /// Tiles written without annotations.
    pub empty_tiles: usize,
    /// Tiles selected but not written because of a tile error.
    pub tiles_skipped: usize,
    /// Label lines written.
    pub labels_written: usize,
    /// Matches dropped because their clipped box had no area.
    pub degenerate_labels: usize,
    /// Seed used for empty-tile sampling.
    pub seed: u64,
    /// Wall time in seconds.
    pub duration_secs: f64,
}

#[derive(Debug, Default)]
struct WriteStats {
    annotated: usize,
    empty: usize,
    skipped: usize,
    labels: usize,
}

impl WriteStats {
    const fn merge(self, other: Self) -> Self {
        Self {
            annotated: self.annotated + other.annotated,
            empty: self.empty + other.empty,
            skipped: self.skipped + other.skipped,
            labels: self.labels + other.labels,
        }
    }
}

/// Cut a raster into training tiles with YOLO label files.
///
/// Writes `images/patch_<x>_<y>.png` and `labels/patch_<x>_<y>.txt` for
/// every tile with at least one annotation, plus a seeded random share of
/// empty tiles. Annotations in another spatial reference are reprojected
/// to the raster's first.
pub fn create_dataset(
    source: &dyn RasterSource,
    annotations: &AnnotationSet,
    options: &DatasetOptions,
    cancel: &CancelToken,
) -> Result<DatasetSummary> {
    let start = Instant::now();
    let extent = source.extent();
    let annotations = annotations.aligned_to(extent.spatial_ref.as_ref())?;
    let mapper = extent.mapper()?;

    let patch_size = options.tiling.patch_size;
    let grid = TileGrid::new(
        extent.width,
        extent.height,
        patch_size,
        options.tiling.stride,
        TilePolicy::Training,
    );
    let seed = options.seed.unwrap_or_else(rand::random);
    info!(
        "Training grid: {} x {} tile(s) of {patch_size}px, stride {} (seed {seed})",
        grid.x_origins().len(),
        grid.y_origins().len(),
        options.tiling.stride
    );

    if grid.is_empty() {
        warn!(
            "Raster of {}x{} pixels yields no full {patch_size}px tile; nothing to write",
            extent.width, extent.height
        );
        return Ok(DatasetSummary {
            seed,
            duration_secs: start.elapsed().as_secs_f64(),
            ..DatasetSummary::default()
        });
    }

    let tiles: Vec<Tile> = grid.tiles().collect();
    let projector = AnnotationProjector::new(&mapper, patch_size);
    let projected: Vec<TileLabels> = tiles
        .par_iter()
        .map(|tile| projector.project(tile, &annotations))
        .collect();

    // Keep decisions are drawn in tile order so the seed alone fixes the output.
    let mut sampler = EmptyTileSampler::new(options.empty_keep_probability, StdRng::seed_from_u64(seed));
    let degenerate_labels: usize = projected.iter().map(|p| p.degenerate).sum();
    let selected: Vec<(Tile, TileLabels)> = tiles
        .into_iter()
        .zip(projected)
        .filter(|(_, labels)| sampler.keep(labels))
        .collect();
    debug!("{} of {} tile(s) selected", selected.len(), grid.len());

    let images_dir = options.output_dir.join(IMAGES_DIR);
    let labels_dir = options.output_dir.join(LABELS_DIR);
    for dir in [&images_dir, &labels_dir] {
        std::fs::create_dir_all(dir).map_err(|e| Error::OutputWrite {
            path: dir.clone(),
            source: e,
        })?;
    }

    let pb = create_tile_progress(selected.len(), "dataset", options.progress);
    let stats = selected
        .par_iter()
        .try_fold(WriteStats::default, |mut stats, (tile, labels)| {
            if cancel.is_cancelled() {
                return Err(Error::Interrupted);
            }
            match write_tile(source, tile, labels, &images_dir, &labels_dir) {
                Ok(()) => {
                    if labels.has_matches() {
                        stats.annotated += 1;
                    } else {
                        stats.empty += 1;
                    }
                    stats.labels += labels.labels.len();
                }
                Err(e) if e.is_tile_local() && !options.fail_fast => {
                    warn!("Skipping tile ({}, {}): {e}", tile.x, tile.y);
                    stats.skipped += 1;
                }
                Err(e) => return Err(e),
            }
            inc_progress(pb.as_ref());
            Ok(stats)
        })
        .try_reduce(WriteStats::default, |a, b| Ok(a.merge(b)));
    finish_progress(pb, "Tiles written");
    let stats = stats?;

    Ok(DatasetSummary {
        tiles_total: grid.len(),
        annotated_tiles: stats.annotated,
        empty_tiles: stats.empty,
        tiles_skipped: stats.skipped,
        labels_written: stats.labels,
        degenerate_labels,
        seed,
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

fn write_tile(
    source: &dyn RasterSource,
    tile: &Tile,
    labels: &TileLabels,
    images_dir: &Path,
    labels_dir: &Path,
) -> Result<()> {
    let stem = tile.stem(TILE_PREFIX);
    let window = source.read_window(tile.x, tile.y, tile.patch_size, tile.patch_size)?;
    let image = tile_image(&window, &stem)?;

    let image_path = images_dir.join(format!("{stem}.{IMAGE_EXTENSION}"));
    image.save(&image_path).map_err(|e| Error::TileWrite {
        path: image_path.clone(),
        source: e,
    })?;

    write_label_file(
        &labels_dir.join(format!("{stem}.{LABEL_EXTENSION}")),
        &labels.labels,
    )
}

/// Single-band windows stay grayscale; others take their first three bands.
fn tile_image(window: &PixelWindow, stem: &str) -> Result<DynamicImage> {
    let size_error = || Error::Internal {
        message: format!("tile {stem} buffer does not match its size"),
    };
    if window.bands == 1 {
        #[allow(clippy::cast_possible_truncation)]
        let gray = GrayImage::from_raw(window.width as u32, window.height as u32, window.band(0).to_vec())
            .ok_or_else(size_error)?;
        return Ok(DynamicImage::ImageLuma8(gray));
    }
    let rgb = to_rgb(window)?.to_rgb_image().ok_or_else(size_error)?;
    Ok(DynamicImage::ImageRgb8(rgb))
}
