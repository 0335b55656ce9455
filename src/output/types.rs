//! Output type definitions.

use crate::detection::{GlobalDetection, PixelBox};
use crate::geo::{CoordinateMapper, LineString};
use geo::BoundingRect;

/// A deduplicated detection ready to be written as a geographic feature.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    /// Closed polygon ring in the raster's coordinate system.
    pub ring: LineString<f64>,
    /// Box in raster pixels.
    pub pixel_box: PixelBox,
    /// Class id.
    pub class_id: u32,
    /// Class name, or the id when no name is configured.
    pub class_name: String,
    /// Detection confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl GeoFeature {
    /// Map a detection's pixel box to a geographic polygon.
    pub fn from_detection(
        detection: &GlobalDetection,
        mapper: &CoordinateMapper,
        class_names: &[String],
    ) -> Self {
        let b = detection.bbox;
        let class_name = class_names
            .get(detection.class_id as usize)
            .cloned()
            .unwrap_or_else(|| detection.class_id.to_string());

        Self {
            ring: mapper.pixel_rect_to_geo_ring(b.x_min, b.y_min, b.x_max, b.y_max),
            pixel_box: b,
            class_id: detection.class_id,
            class_name,
            confidence: detection.confidence,
        }
    }

    /// Geographic bounds as `(min_x, min_y, max_x, max_y)`.
    pub fn geo_bounds(&self) -> (f64, f64, f64, f64) {
        self.ring.bounding_rect().map_or(
            (f64::NAN, f64::NAN, f64::NAN, f64::NAN),
            |r| (r.min().x, r.min().y, r.max().x, r.max().y),
        )
    }

    /// Ring vertices as `[x, y]` positions.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.ring.coords().map(|c| [c.x, c.y]).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::geo::Affine;

    #[test]
    fn test_feature_from_detection() {
        let mapper = CoordinateMapper::new(Affine::north_up(1000.0, 2000.0, 0.5, 0.5)).unwrap();
        let det = GlobalDetection {
            bbox: PixelBox::new(10.0, 20.0, 30.0, 40.0),
            confidence: 0.75,
            class_id: 0,
            tile_index: 2,
        };
        let feature = GeoFeature::from_detection(&det, &mapper, &["burrow".to_string()]);
        assert_eq!(feature.class_name, "burrow");
        assert_eq!(feature.positions().len(), 5);
        assert!(feature.ring.is_closed());
        assert_eq!(feature.geo_bounds(), (1005.0, 1980.0, 1015.0, 1990.0));
    }

    #[test]
    fn test_unnamed_class_uses_id() {
        let mapper = CoordinateMapper::new(Affine::IDENTITY).unwrap();
        let det = GlobalDetection {
            bbox: PixelBox::new(0.0, 0.0, 1.0, 1.0),
            confidence: 0.5,
            class_id: 3,
            tile_index: 0,
        };
        assert_eq!(GeoFeature::from_detection(&det, &mapper, &[]).class_name, "3");
    }
}
