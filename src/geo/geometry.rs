//! Annotation geometry in geographic coordinates.

use geo::{BoundingRect, Coord, Intersects, MapCoords, MultiPolygon, Polygon, Rect};

/// One or more polygons with a cached bounding rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Geometry {
    /// Wrap a multipolygon. `None` if it has no vertices at all.
    pub fn new(shape: MultiPolygon<f64>) -> Option<Self> {
        let bounds = shape.bounding_rect()?;
        Some(Self { shape, bounds })
    }

    /// Build from polygons. `None` if there are no vertices at all.
    pub fn from_polygons(polygons: Vec<Polygon<f64>>) -> Option<Self> {
        Self::new(MultiPolygon::new(polygons))
    }

    /// Single axis-aligned rectangle.
    pub fn rect(rect: Rect<f64>) -> Self {
        Self {
            shape: MultiPolygon::new(vec![rect.to_polygon()]),
            bounds: rect,
        }
    }

    /// Bounding rectangle of all polygons.
    pub const fn bounds(&self) -> &Rect<f64> {
        &self.bounds
    }

    /// Member polygons.
    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.shape.0
    }

    /// Exact intersection test against a rectangle, boundaries included.
    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.bounds.intersects(rect) && self.shape.intersects(rect)
    }

    /// Apply a fallible function to every vertex.
    pub fn try_map_coords<E>(
        &self,
        func: impl Fn(Coord<f64>) -> Result<Coord<f64>, E> + Copy,
    ) -> Result<Option<Self>, E> {
        Ok(Self::new(self.shape.try_map_coords(func)?))
    }
}
