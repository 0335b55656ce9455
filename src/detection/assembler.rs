//! Translation of tile detections into raster pixel space.

use crate::detection::{GlobalDetection, RawDetection};

/// Accumulates detections from many tiles in global pixel coordinates.
///
/// Each worker owns one assembler; partial assemblers are combined with
/// [`GlobalAssembler::merge`]. No filtering beyond dropping zero-area boxes
/// happens here.
#[derive(Debug, Default)]
pub struct GlobalAssembler {
    detections: Vec<GlobalDetection>,
    degenerate: usize,
}

impl GlobalAssembler {
    /// Empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one tile's detections into raster pixels and keep them.
    pub fn add_tile(&mut self, raw: impl IntoIterator<Item = RawDetection>) {
        for det in raw {
            let origin = (f64::from(det.tile.x), f64::from(det.tile.y));
            let bbox = det
                .local
                .bbox
                .to_pixels(f64::from(det.tile.patch_size), origin);

            if bbox.is_degenerate() {
                self.degenerate += 1;
                continue;
            }

            self.detections.push(GlobalDetection {
                bbox,
                confidence: det.local.confidence,
                class_id: det.local.class_id,
                tile_index: det.tile.index,
            });
        }
    }

    /// Combine with another worker's assembler.
    #[must_use]
    pub fn merge(mut self, mut other: Self) -> Self {
        self.detections.append(&mut other.detections);
        self.degenerate += other.degenerate;
        self
    }

    /// Detections collected so far.
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Zero-area boxes dropped so far.
    pub const fn degenerate(&self) -> usize {
        self.degenerate
    }

    /// All detections ordered by tile index, then detector output order.
    pub fn finish(mut self) -> Vec<GlobalDetection> {
        // Stable: detector order within a tile is preserved.
        self.detections.sort_by_key(|d| d.tile_index);
        self.detections
    }
}
