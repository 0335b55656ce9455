//! Coordinate reprojection between spatial references.

use crate::error::{Error, Result};
use crate::geo::{Geometry, SpatialRef};
use geo::Coord;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::fmt;

/// Resolve a spatial reference to a projection definition.
///
/// `EPSG:<code>` is looked up in the bundled EPSG registry; a raw
/// `+proj=` string is used as is.
fn resolve(spatial_ref: &SpatialRef) -> std::result::Result<Proj, String> {
    let definition = if let Some(code) = spatial_ref.epsg_code() {
        crs_definitions::from_code(code)
            .map(|def| def.proj4)
            .ok_or_else(|| format!("EPSG:{code} is not in the EPSG registry"))?
    } else if spatial_ref.as_str().starts_with("+proj=") {
        spatial_ref.as_str()
    } else {
        return Err(format!("'{spatial_ref}' is neither an EPSG code nor a PROJ string"));
    };

    Proj::from_proj_string(definition).map_err(|e| format!("invalid definition for {spatial_ref}: {e:?}"))
}

/// Point transformer from one spatial reference to another.
///
/// Geographic references take and return degrees.
pub struct Reprojector {
    from: SpatialRef,
    to: SpatialRef,
    source: Proj,
    target: Proj,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl Reprojector {
    /// Build a transformer from annotation reference `from` to raster reference `to`.
    ///
    /// Fails with [`Error::SpatialReferenceMismatch`] when either side
    /// cannot be resolved to a projection.
    pub fn new(from: &SpatialRef, to: &SpatialRef) -> Result<Self> {
        let mismatch = |reason: String| Error::SpatialReferenceMismatch {
            raster: to.to_string(),
            annotations: from.to_string(),
            reason,
        };
        let source = resolve(from).map_err(mismatch)?;
        let target = resolve(to).map_err(mismatch)?;

        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            source_is_geographic: source.is_latlong(),
            target_is_geographic: target.is_latlong(),
            source,
            target,
        })
    }

    /// Transform one point.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let failure = |reason: String| Error::Reprojection {
            from: self.from.to_string(),
            to: self.to.to_string(),
            x,
            y,
            reason,
        };

        let mut point = if self.source_is_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&self.source, &self.target, &mut point).map_err(|e| failure(format!("{e:?}")))?;

        let (out_x, out_y) = if self.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(failure("result is not finite".to_string()));
        }
        Ok((out_x, out_y))
    }

    /// Transform every vertex of a geometry.
    pub fn reproject(&self, geometry: &Geometry) -> Result<Geometry> {
        geometry
            .try_map_coords(|c| self.transform(c.x, c.y).map(|(x, y)| Coord { x, y }))?
            .ok_or_else(|| Error::Internal {
                message: "reprojected geometry has no vertices".to_string(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::Rect;

    fn wgs84_to_utm30() -> Reprojector {
        Reprojector::new(&SpatialRef::parse("EPSG:4326"), &SpatialRef::parse("EPSG:32630")).unwrap()
    }

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        // 3 degrees west is the central meridian of UTM zone 30.
        let (x, y) = wgs84_to_utm30().transform(-3.0, 40.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3, "easting {x}");
        assert!((y - 4_427_757.0).abs() < 5.0, "northing {y}");
    }

    #[test]
    fn test_round_trip_through_utm() {
        let back =
            Reprojector::new(&SpatialRef::parse("EPSG:32630"), &SpatialRef::parse("EPSG:4326")).unwrap();
        let (x, y) = wgs84_to_utm30().transform(-3.7, 40.4).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();
        assert!((lon + 3.7).abs() < 1e-6);
        assert!((lat - 40.4).abs() < 1e-6);
    }

    #[test]
    fn test_proj_string_reference() {
        let reprojector = Reprojector::new(
            &SpatialRef::parse("EPSG:4326"),
            &SpatialRef::parse("+proj=utm +zone=30 +datum=WGS84 +units=m +no_defs"),
        )
        .unwrap();
        let (x, _) = reprojector.transform(-3.0, 40.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_unresolvable_reference_is_mismatch() {
        let result = Reprojector::new(&SpatialRef::parse("EPSG:4326"), &SpatialRef::parse("local grid"));
        assert!(matches!(result, Err(Error::SpatialReferenceMismatch { .. })));
    }

    #[test]
    fn test_reproject_geometry_bounds() {
        let geom = Geometry::rect(Rect::new((-3.01, 40.0), (-2.99, 40.01)));
        let projected = wgs84_to_utm30().reproject(&geom).unwrap();
        let bounds = projected.bounds();
        assert!(bounds.min().x < 500_000.0 && bounds.max().x > 500_000.0);
        assert!(bounds.height() > 1_000.0 && bounds.height() < 1_200.0);
    }
}
