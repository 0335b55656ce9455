//! Pixel to geographic coordinate mapping.

use crate::error::{Error, Result};
use geo::{BoundingRect, Coord, LineString, Rect};

/// Affine transform from pixel `(col, row)` to geographic `(x, y)`.
///
/// `x = a * col + b * row + c` and `y = d * col + e * row + f`, with
/// `(col, row) = (0, 0)` at the outer corner of the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    /// Pixel width (x per column).
    pub a: f64,
    /// Row rotation term.
    pub b: f64,
    /// X of the top-left corner.
    pub c: f64,
    /// Column rotation term.
    pub d: f64,
    /// Pixel height (y per row, negative for north-up rasters).
    pub e: f64,
    /// Y of the top-left corner.
    pub f: f64,
}

impl Affine {
    /// Identity transform (geographic = pixel).
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    /// North-up transform with square-or-not pixels and no rotation.
    pub const fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            a: pixel_width,
            b: 0.0,
            c: origin_x,
            d: 0.0,
            e: -pixel_height,
            f: origin_y,
        }
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.a.mul_add(self.e, -(self.b * self.d))
    }

    /// Whether the transform has no rotation or shear.
    pub fn is_axis_aligned(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }
}

/// Bidirectional pixel/geographic mapping for one raster.
///
/// Outputs are never rounded; callers snap to the pixel grid only when
/// they write labels or boxes.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    forward: Affine,
    inverse: Affine,
}

impl CoordinateMapper {
    /// Build a mapper, failing if the transform cannot be inverted.
    pub fn new(transform: Affine) -> Result<Self> {
        let det = transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(Error::NonInvertibleTransform { determinant: det });
        }

        let inverse = if transform.is_axis_aligned() {
            Affine {
                a: 1.0 / transform.a,
                b: 0.0,
                c: -transform.c / transform.a,
                d: 0.0,
                e: 1.0 / transform.e,
                f: -transform.f / transform.e,
            }
        } else {
            let Affine { a, b, c, d, e, f } = transform;
            Affine {
                a: e / det,
                b: -b / det,
                c: b.mul_add(f, -(c * e)) / det,
                d: -d / det,
                e: a / det,
                f: c.mul_add(d, -(a * f)) / det,
            }
        };

        Ok(Self {
            forward: transform,
            inverse,
        })
    }

    /// The forward transform.
    pub const fn transform(&self) -> &Affine {
        &self.forward
    }

    /// Map a pixel position to geographic coordinates.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let t = &self.forward;
        (
            t.a.mul_add(col, t.b.mul_add(row, t.c)),
            t.d.mul_add(col, t.e.mul_add(row, t.f)),
        )
    }

    /// Map geographic coordinates to a (fractional) pixel position.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let t = &self.forward;
        if t.is_axis_aligned() {
            // Direct division keeps the round trip exact.
            return ((x - t.c) / t.a, (y - t.f) / t.e);
        }
        let i = &self.inverse;
        (
            i.a.mul_add(x, i.b.mul_add(y, i.c)),
            i.d.mul_add(x, i.e.mul_add(y, i.f)),
        )
    }

    /// Geographic bounding rectangle of a pixel rectangle.
    pub fn pixel_rect_to_geo_bounds(&self, col0: f64, row0: f64, col1: f64, row1: f64) -> Rect<f64> {
        let (x0, y0) = self.pixel_to_geo(col0, row0);
        self.pixel_rect_to_geo_ring(col0, row0, col1, row1)
            .bounding_rect()
            .unwrap_or_else(|| Rect::new((x0, y0), (x0, y0)))
    }

    /// Closed ring of the four mapped corners of a pixel rectangle.
    pub fn pixel_rect_to_geo_ring(&self, col0: f64, row0: f64, col1: f64, row1: f64) -> LineString<f64> {
        let corners = [(col0, row0), (col1, row0), (col1, row1), (col0, row1), (col0, row0)];
        corners
            .iter()
            .map(|&(c, r)| {
                let (x, y) = self.pixel_to_geo(c, r);
                Coord { x, y }
            })
            .collect()
    }

    /// Pixel-space bounding rectangle of a geographic rectangle.
    pub fn geo_bounds_to_pixel(&self, bounds: &Rect<f64>) -> Rect<f64> {
        let (min, max) = (bounds.min(), bounds.max());
        let corners: LineString<f64> = [(min.x, min.y), (max.x, min.y), (max.x, max.y), (min.x, max.y)]
            .iter()
            .map(|&(x, y)| {
                let (col, row) = self.geo_to_pixel(x, y);
                Coord { x: col, y: row }
            })
            .collect();
        corners.bounding_rect().unwrap_or(*bounds)
    }
}
