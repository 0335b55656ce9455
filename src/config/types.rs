//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CLASS_FIELD, DEFAULT_CLASS_VALUE, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_DETECTOR_IOU_THRESHOLD, DEFAULT_EMPTY_KEEP_PROBABILITY, DEFAULT_IOU_THRESHOLD,
    DEFAULT_PATCH_SIZE, DEFAULT_STRIDE, output_extensions,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tile layout settings.
    #[serde(default)]
    pub tiling: TilingConfig,

    /// Dataset generation settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Detection settings.
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Tile layout settings shared by both modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TilingConfig {
    /// Tile edge length in pixels.
    pub patch_size: u32,

    /// Distance between tile origins in pixels.
    pub stride: u32,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            stride: DEFAULT_STRIDE,
        }
    }
}

/// Dataset generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    /// Probability of keeping a tile with no annotations.
    pub empty_keep_probability: f64,

    /// Seed for empty-tile sampling; drawn at random when absent.
    pub seed: Option<u64>,

    /// Annotation property holding the class value.
    pub class_field: String,

    /// Accepted class values; position in this list is the class id.
    pub class_values: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            empty_keep_probability: DEFAULT_EMPTY_KEEP_PROBABILITY,
            seed: None,
            class_field: DEFAULT_CLASS_FIELD.to_string(),
            class_values: vec![DEFAULT_CLASS_VALUE.to_string()],
        }
    }
}

/// Detection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Minimum detector confidence.
    pub confidence_threshold: f32,

    /// IoU above which cross-tile duplicates are suppressed.
    pub iou_threshold: f32,

    /// IoU used by the detector's own per-tile suppression.
    pub detector_iou_threshold: f32,

    /// Default ONNX model.
    pub model: Option<PathBuf>,

    /// Class names by class id.
    pub class_names: Vec<String>,

    /// Output formats.
    pub formats: Vec<OutputFormat>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            detector_iou_threshold: DEFAULT_DETECTOR_IOU_THRESHOLD,
            model: None,
            class_names: Vec::new(),
            formats: vec![OutputFormat::GeoJson],
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// GeoJSON FeatureCollection of polygons.
    GeoJson,
    /// CSV table with geographic and pixel bounds.
    Csv,
}

impl OutputFormat {
    /// File extension for this format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::GeoJson => output_extensions::GEOJSON,
            Self::Csv => output_extensions::CSV,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GeoJson => write!(f, "geojson"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "geojson" | "json" => Ok(Self::GeoJson),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}
