//! Per-tile detector invocation.

use crate::detection::channels::{TileImage, to_rgb};
use crate::detection::{LocalDetection, RawDetection};
use crate::error::Result;
use crate::raster::RasterSource;
use crate::tiling::Tile;
use tracing::trace;

/// Object detector over square RGB tiles.
///
/// Implementations are shared by all tile workers and must tolerate
/// concurrent calls.
pub trait Detector: Send + Sync {
    /// Detect objects in a tile.
    ///
    /// Boxes are normalized to the tile. Detections below
    /// `confidence_threshold` may be returned; the caller filters them.
    fn detect(&self, image: &TileImage, confidence_threshold: f32) -> Result<Vec<LocalDetection>>;

    /// Detector name for logging.
    fn name(&self) -> &str;
}

/// Reads tiles, enforces the channel contract and calls the detector.
pub struct DetectionRunner<'a> {
    detector: &'a dyn Detector,
    confidence_threshold: f32,
}

impl<'a> DetectionRunner<'a> {
    /// Create a runner.
    pub fn new(detector: &'a dyn Detector, confidence_threshold: f32) -> Self {
        Self {
            detector,
            confidence_threshold,
        }
    }

    /// Detector used by this runner.
    pub fn detector(&self) -> &dyn Detector {
        self.detector
    }

    /// Run the detector on one tile.
    ///
    /// The window is always `patch_size` square; parts outside the raster
    /// are zero-filled.
    pub fn run_tile(&self, source: &dyn RasterSource, tile: &Tile) -> Result<Vec<RawDetection>> {
        let window = source.read_window(tile.x, tile.y, tile.patch_size, tile.patch_size)?;
        let image = to_rgb(&window)?;

        let detections: Vec<RawDetection> = self
            .detector
            .detect(&image, self.confidence_threshold)?
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .map(|local| RawDetection { tile: *tile, local })
            .collect();

        trace!(
            "Tile {} ({}, {}): {} detection(s)",
            tile.index,
            tile.x,
            tile.y,
            detections.len()
        );
        Ok(detections)
    }
}
