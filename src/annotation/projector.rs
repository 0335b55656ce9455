//! Projection of geographic annotations into tile-local labels.

use crate::annotation::Annotation;
use crate::geo::CoordinateMapper;
use crate::tiling::Tile;
use rand::Rng;

/// Normalized box label relative to a tile, in YOLO order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalLabel {
    /// Class id.
    pub class_id: u32,
    /// Box centre x in `[0, 1]`.
    pub cx: f64,
    /// Box centre y in `[0, 1]`.
    pub cy: f64,
    /// Box width in `[0, 1]`.
    pub w: f64,
    /// Box height in `[0, 1]`.
    pub h: f64,
}

impl LocalLabel {
    /// Normalize a tile-pixel box `(xmin, ymin, xmax, ymax)`.
    pub fn from_pixel_box(class_id: u32, bbox: (f64, f64, f64, f64), patch_size: u32) -> Self {
        let (xmin, ymin, xmax, ymax) = bbox;
        let size = f64::from(patch_size);
        let w = xmax - xmin;
        let h = ymax - ymin;
        Self {
            class_id,
            cx: (xmin + w / 2.0) / size,
            cy: (ymin + h / 2.0) / size,
            w: w / size,
            h: h / size,
        }
    }

    /// Back to tile-pixel `(xmin, ymin, xmax, ymax)`.
    pub fn to_pixel_box(&self, patch_size: u32) -> (f64, f64, f64, f64) {
        let size = f64::from(patch_size);
        (
            (self.cx - self.w / 2.0) * size,
            (self.cy - self.h / 2.0) * size,
            (self.cx + self.w / 2.0) * size,
            (self.cy + self.h / 2.0) * size,
        )
    }
}

/// Projection result for one tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileLabels {
    /// Annotations whose geometry intersects the tile.
    pub matched: usize,
    /// Labels that survived clipping.
    pub labels: Vec<LocalLabel>,
    /// Matches dropped because the clipped box had no area.
    pub degenerate: usize,
}

impl TileLabels {
    /// Whether any annotation touched the tile.
    pub const fn has_matches(&self) -> bool {
        self.matched > 0
    }
}

/// Projects annotations into the local frame of training tiles.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationProjector<'a> {
    mapper: &'a CoordinateMapper,
    patch_size: u32,
}

impl<'a> AnnotationProjector<'a> {
    /// Create a projector for tiles of `patch_size` pixels.
    pub const fn new(mapper: &'a CoordinateMapper, patch_size: u32) -> Self {
        Self { mapper, patch_size }
    }

    /// Labels for every annotation whose geometry intersects the tile.
    pub fn project(&self, tile: &Tile, annotations: &[Annotation]) -> TileLabels {
        let (x0, y0) = (f64::from(tile.x), f64::from(tile.y));
        let size = f64::from(self.patch_size);
        let tile_bounds = self
            .mapper
            .pixel_rect_to_geo_bounds(x0, y0, x0 + size, y0 + size);

        let mut result = TileLabels::default();
        for annotation in annotations
            .iter()
            .filter(|a| a.geometry.intersects_rect(&tile_bounds))
        {
            result.matched += 1;

            // Snap to the pixel grid only here, where the label is produced.
            let px = self.mapper.geo_bounds_to_pixel(annotation.geometry.bounds());
            let (min, max) = (px.min(), px.max());
            let max_local = size - 1.0;
            let xmin = (min.x.floor() - x0).max(0.0);
            let ymin = (min.y.floor() - y0).max(0.0);
            let xmax = (max.x.floor() - x0).min(max_local);
            let ymax = (max.y.floor() - y0).min(max_local);

            if xmax > xmin && ymax > ymin {
                result.labels.push(LocalLabel::from_pixel_box(
                    annotation.class_id,
                    (xmin, ymin, xmax, ymax),
                    self.patch_size,
                ));
            } else {
                result.degenerate += 1;
            }
        }
        result
    }
}

/// Decides which training tiles are written.
///
/// Tiles with annotations are always kept. Empty tiles are kept with
/// probability `p_empty`, drawn from the injected generator in call order.
#[derive(Debug)]
pub struct EmptyTileSampler<R: Rng> {
    p_empty: f64,
    rng: R,
}

impl<R: Rng> EmptyTileSampler<R> {
    /// Create a sampler.
    pub const fn new(p_empty: f64, rng: R) -> Self {
        Self { p_empty, rng }
    }

    /// Keep decision for a tile.
    pub fn keep(&mut self, labels: &TileLabels) -> bool {
        labels.has_matches() || self.rng.random::<f64>() < self.p_empty
    }
}
