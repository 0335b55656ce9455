//! Spatial reference identifiers.

use crate::error::Result;
use crate::geo::Reprojector;
use std::fmt;
use tracing::{info, warn};

/// Normalized spatial reference identifier.
///
/// Recognised forms (`EPSG:32630`, `epsg:32630`,
/// `urn:ogc:def:crs:EPSG::32630`, `OGC:CRS84`) collapse to `EPSG:<code>`;
/// anything else (such as a `+proj=` string) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpatialRef(String);

impl SpatialRef {
    /// Parse and normalize an identifier.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Self::wgs84();
        }

        let code = upper
            .strip_prefix("EPSG:")
            .or_else(|| upper.rsplit_once("EPSG:").map(|(_, tail)| tail))
            .map(|tail| tail.trim_start_matches(':'))
            .filter(|tail| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()));

        code.map_or_else(
            || Self(trimmed.to_string()),
            |code| Self(format!("EPSG:{code}")),
        )
    }

    /// WGS 84 geographic coordinates, the GeoJSON default.
    pub fn wgs84() -> Self {
        Self("EPSG:4326".to_string())
    }

    /// Normalized identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// EPSG code, if the identifier is one.
    pub fn epsg_code(&self) -> Option<u16> {
        self.0.strip_prefix("EPSG:")?.parse().ok()
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decide how annotations relate to the raster's spatial reference.
///
/// Returns a [`Reprojector`] when both references are known and differ.
/// Unknown references on either side are assumed to match. References
/// that differ and cannot be resolved are fatal.
pub fn reconcile(
    raster: Option<&SpatialRef>,
    annotations: Option<&SpatialRef>,
) -> Result<Option<Reprojector>> {
    match (raster, annotations) {
        (Some(r), Some(a)) if r != a => {
            let reprojector = Reprojector::new(a, r)?;
            info!("Reprojecting annotations from {a} to raster {r}");
            Ok(Some(reprojector))
        }
        (Some(_), Some(_)) => Ok(None),
        (None, None) => {
            warn!("Spatial reference unknown for raster and annotations; assuming they match");
            Ok(None)
        }
        (None, Some(a)) => {
            warn!("Raster spatial reference unknown; assuming annotations' {a}");
            Ok(None)
        }
        (Some(r), None) => {
            warn!("Annotation spatial reference unknown; assuming raster's {r}");
            Ok(None)
        }
    }
}
