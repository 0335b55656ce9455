//! Geographic coordinate handling.

pub mod geometry;
mod reproject;
mod spatial_ref;
mod transform;

pub use ::geo::{Coord, LineString, MultiPolygon, Polygon, Rect};
pub use geometry::Geometry;
pub use reproject::Reprojector;
pub use spatial_ref::{SpatialRef, reconcile};
pub use transform::{Affine, CoordinateMapper};
