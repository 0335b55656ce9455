//! GeoJSON annotation loading.
//!
//! Reads a FeatureCollection, keeps features whose class property matches
//! one of the configured values and turns their polygons into
//! [`Annotation`]s. Uses `serde_json` with typed records so malformed
//! files fail loudly while unsupported geometry types are skipped. A
//! collection without a `crs` member is WGS 84 longitude/latitude.

use crate::annotation::{Annotation, AnnotationSet};
use crate::error::{Error, Result};
use crate::geo::{Coord, Geometry, LineString, Polygon, SpatialRef};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    crs: Option<NamedCrs>,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct NamedCrs {
    properties: NamedCrsProperties,
}

#[derive(Debug, Deserialize)]
struct NamedCrsProperties {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

type Ring = Vec<Vec<f64>>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    #[serde(other)]
    Unsupported,
}

/// Load annotations from a GeoJSON file.
///
/// # Arguments
///
/// * `path` - GeoJSON FeatureCollection
/// * `class_field` - Property holding the class value
/// * `class_values` - Accepted values; a feature's class id is the index of its value
pub fn load_geojson(path: &Path, class_field: &str, class_values: &[String]) -> Result<AnnotationSet> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::AnnotationRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let set = parse_geojson(&contents, path, class_field, class_values)?;
    info!(
        "Loaded {} annotation(s) of class(es) {:?} from {}",
        set.annotations.len(),
        class_values,
        path.display()
    );
    Ok(set)
}

/// Parse GeoJSON text. See [`load_geojson`].
pub fn parse_geojson(
    contents: &str,
    path: &Path,
    class_field: &str,
    class_values: &[String],
) -> Result<AnnotationSet> {
    let collection: FeatureCollection =
        serde_json::from_str(contents).map_err(|e| Error::AnnotationParse {
            path: path.to_path_buf(),
            source: e,
        })?;

    let spatial_ref = collection
        .crs
        .map_or_else(SpatialRef::wgs84, |crs| SpatialRef::parse(&crs.properties.name));

    let mut annotations = Vec::new();
    let mut unsupported = 0usize;

    for (i, feature) in collection.features.into_iter().enumerate() {
        let Some(value) = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(class_field))
            .and_then(property_as_string)
        else {
            continue;
        };
        let Some(class_id) = class_values.iter().position(|v| *v == value) else {
            continue;
        };

        let polygons = match feature.geometry {
            Some(RawGeometry::Polygon { coordinates }) => to_polygon(coordinates).into_iter().collect(),
            Some(RawGeometry::MultiPolygon { coordinates }) => {
                coordinates.into_iter().filter_map(to_polygon).collect()
            }
            Some(RawGeometry::Unsupported) | None => Vec::new(),
        };

        let Some(geometry) = Geometry::from_polygons(polygons) else {
            debug!("Feature {i} has no usable polygon geometry");
            unsupported += 1;
            continue;
        };

        #[allow(clippy::cast_possible_truncation)]
        annotations.push(Annotation {
            geometry,
            class_id: class_id as u32,
        });
    }

    if unsupported > 0 {
        warn!(
            "Skipped {unsupported} matching feature(s) without Polygon/MultiPolygon geometry in {}",
            path.display()
        );
    }

    Ok(AnnotationSet {
        annotations,
        spatial_ref: Some(spatial_ref),
    })
}

fn property_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn to_ring(positions: Ring) -> LineString<f64> {
    positions
        .into_iter()
        .filter_map(|p| match p.as_slice() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect()
}

fn to_polygon(rings: Vec<Ring>) -> Option<Polygon<f64>> {
    let mut rings = rings.into_iter().map(to_ring);
    let exterior = rings.next().filter(|r| r.0.len() >= 3)?;
    Some(Polygon::new(exterior, rings.filter(|r| r.0.len() >= 3).collect()))
}
