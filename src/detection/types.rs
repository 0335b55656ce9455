//! Detection data types.

use crate::tiling::Tile;

/// Box in tile-normalized coordinates, `[0, 1]` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBox {
    /// Left edge.
    pub x_min: f32,
    /// Top edge.
    pub y_min: f32,
    /// Right edge.
    pub x_max: f32,
    /// Bottom edge.
    pub y_max: f32,
}

impl NormalizedBox {
    /// Create a box from its edges.
    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Scale by `size` pixels and shift by `origin`.
    pub fn to_pixels(&self, size: f64, origin: (f64, f64)) -> PixelBox {
        let (ox, oy) = origin;
        PixelBox::new(
            f64::from(self.x_min).mul_add(size, ox),
            f64::from(self.y_min).mul_add(size, oy),
            f64::from(self.x_max).mul_add(size, ox),
            f64::from(self.y_max).mul_add(size, oy),
        )
    }
}

/// Axis-aligned box in global raster pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    /// Left edge (column).
    pub x_min: f64,
    /// Top edge (row).
    pub y_min: f64,
    /// Right edge (column).
    pub x_max: f64,
    /// Bottom edge (row).
    pub y_max: f64,
}

impl PixelBox {
    /// Create a box from its edges.
    pub const fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Box area; zero for inverted boxes.
    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min).max(0.0) * (self.y_max - self.y_min).max(0.0)
    }

    /// Whether the box has no positive area.
    pub fn is_degenerate(&self) -> bool {
        !(self.x_max > self.x_min && self.y_max > self.y_min)
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Self) -> f64 {
        let x1 = self.x_min.max(other.x_min);
        let y1 = self.y_min.max(other.y_min);
        let x2 = self.x_max.min(other.x_max);
        let y2 = self.y_max.min(other.y_max);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }
}

/// Detector output for a single tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalDetection {
    /// Tile-normalized box.
    pub bbox: NormalizedBox,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Class id.
    pub class_id: u32,
}

/// A detection still in its tile's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Tile the detection came from.
    pub tile: Tile,
    /// Detection in tile-normalized coordinates.
    pub local: LocalDetection,
}

/// A detection in global raster pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalDetection {
    /// Box in raster pixels.
    pub bbox: PixelBox,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Class id.
    pub class_id: u32,
    /// Index of the originating tile.
    pub tile_index: usize,
}
