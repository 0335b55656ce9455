//! Ground-truth annotations and their projection into tiles.

mod geojson;
mod projector;

pub use geojson::{load_geojson, parse_geojson};
pub use projector::{AnnotationProjector, EmptyTileSampler, LocalLabel, TileLabels};

use crate::error::Result;
use crate::geo::{Geometry, SpatialRef, reconcile};
use std::borrow::Cow;

/// A labelled geographic shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Shape in the source's coordinate system.
    pub geometry: Geometry,
    /// Class id.
    pub class_id: u32,
}

/// Annotations loaded from one source.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    /// Annotations that passed the class filter.
    pub annotations: Vec<Annotation>,
    /// Spatial reference declared by the source, if any.
    pub spatial_ref: Option<SpatialRef>,
}

impl AnnotationSet {
    /// Annotations expressed in the raster's spatial reference.
    ///
    /// Borrowed as is when no reprojection is needed.
    pub fn aligned_to(&self, raster: Option<&SpatialRef>) -> Result<Cow<'_, [Annotation]>> {
        let Some(reprojector) = reconcile(raster, self.spatial_ref.as_ref())? else {
            return Ok(Cow::Borrowed(&self.annotations));
        };
        self.annotations
            .iter()
            .map(|a| {
                Ok(Annotation {
                    geometry: reprojector.reproject(&a.geometry)?,
                    class_id: a.class_id,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Cow::Owned)
    }
}
