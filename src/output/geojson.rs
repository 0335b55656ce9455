//! GeoJSON output format writer.

use crate::error::{Error, Result};
use crate::geo::SpatialRef;
use crate::output::{GeoFeature, OutputWriter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// FeatureCollection written to disk.
#[derive(Debug, Serialize)]
struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    crs: Option<NamedCrs>,
    generated_at: DateTime<Utc>,
    features: Vec<Feature<'a>>,
}

#[derive(Debug, Serialize)]
struct NamedCrs {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: NamedCrsProperties,
}

#[derive(Debug, Serialize)]
struct NamedCrsProperties {
    name: String,
}

#[derive(Debug, Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: PolygonGeometry,
    properties: FeatureProperties<'a>,
}

#[derive(Debug, Serialize)]
struct PolygonGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [Vec<[f64; 2]>; 1],
}

#[derive(Debug, Serialize)]
struct FeatureProperties<'a> {
    class: &'a str,
    class_id: u32,
    confidence: f32,
    pixel_bbox: [f64; 4],
}

/// Writer for GeoJSON FeatureCollections.
///
/// Features are buffered and the collection is written on
/// [`OutputWriter::finalize`].
pub struct GeoJsonWriter {
    features: Vec<GeoFeature>,
    output_path: PathBuf,
    spatial_ref: Option<SpatialRef>,
}

impl GeoJsonWriter {
    /// Create a new GeoJSON writer.
    pub fn new(output_path: &Path, spatial_ref: Option<SpatialRef>) -> Self {
        Self {
            features: Vec::new(),
            output_path: output_path.to_path_buf(),
            spatial_ref,
        }
    }
}

impl OutputWriter for GeoJsonWriter {
    fn write_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_feature(&mut self, feature: &GeoFeature) -> Result<()> {
        self.features.push(feature.clone());
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let collection = FeatureCollection {
            kind: "FeatureCollection",
            crs: self.spatial_ref.as_ref().map(|s| NamedCrs {
                kind: "name",
                properties: NamedCrsProperties {
                    name: s.to_string(),
                },
            }),
            generated_at: Utc::now(),
            features: self
                .features
                .iter()
                .map(|f| Feature {
                    kind: "Feature",
                    geometry: PolygonGeometry {
                        kind: "Polygon",
                        coordinates: [f.positions()],
                    },
                    properties: FeatureProperties {
                        class: &f.class_name,
                        class_id: f.class_id,
                        confidence: f.confidence,
                        pixel_bbox: [
                            f.pixel_box.x_min,
                            f.pixel_box.y_min,
                            f.pixel_box.x_max,
                            f.pixel_box.y_max,
                        ],
                    },
                })
                .collect(),
        };

        let output_error = |e: std::io::Error| Error::OutputWrite {
            path: self.output_path.clone(),
            source: e,
        };
        let file = File::create(&self.output_path).map_err(output_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &collection)
            .map_err(|e| Error::JsonSerialize { source: e })?;
        writer.flush().map_err(output_error)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detection::PixelBox;
    use crate::geo::LineString;
    use tempfile::TempDir;

    fn feature() -> GeoFeature {
        GeoFeature {
            ring: LineString::from(vec![[0.0, 0.0], [2.0, 0.0], [2.0, -2.0], [0.0, -2.0], [0.0, 0.0]]),
            pixel_box: PixelBox::new(0.0, 0.0, 2.0, 2.0),
            class_id: 0,
            class_name: "burrow".to_string(),
            confidence: 0.875,
        }
    }

    #[test]
    fn test_geojson_writer_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.geojson");
        let mut writer = GeoJsonWriter::new(&path, Some(SpatialRef::parse("EPSG:25830")));
        writer.write_header().unwrap();
        writer.write_feature(&feature()).unwrap();
        writer.finalize().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["crs"]["properties"]["name"], "EPSG:25830");
        let f = &value["features"][0];
        assert_eq!(f["geometry"]["type"], "Polygon");
        assert_eq!(f["geometry"]["coordinates"][0].as_array().unwrap().len(), 5);
        assert_eq!(f["properties"]["class"], "burrow");
        assert_eq!(f["properties"]["confidence"], 0.875);
    }

    #[test]
    fn test_empty_collection_is_valid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.geojson");
        let mut writer = GeoJsonWriter::new(&path, None);
        writer.finalize().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value.get("crs").is_none());
        assert!(value["features"].as_array().unwrap().is_empty());
    }
}
