//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "geotiler";

/// Configuration file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default tile edge length in pixels.
pub const DEFAULT_PATCH_SIZE: u32 = 512;

/// Default distance between tile origins in pixels.
///
/// Half the patch size, so every interior pixel is seen by four tiles.
pub const DEFAULT_STRIDE: u32 = 256;

/// Default probability of keeping a tile with no annotations.
pub const DEFAULT_EMPTY_KEEP_PROBABILITY: f64 = 0.1;

/// Default minimum detector confidence.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.2;

/// Default IoU above which overlapping detections across tiles are merged.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Default IoU used by the detector's own per-tile suppression.
pub const DEFAULT_DETECTOR_IOU_THRESHOLD: f32 = 0.7;

/// Default annotation property holding the class value.
pub const DEFAULT_CLASS_FIELD: &str = "label";

/// Default annotation class value (single-class datasets).
pub const DEFAULT_CLASS_VALUE: &str = "1";

/// Number of channels the detector consumes.
pub const DETECTOR_CHANNELS: usize = 3;

/// Probability and threshold bounds.
pub mod probability {
    /// Minimum valid value.
    pub const MIN: f64 = 0.0;
    /// Maximum valid value.
    pub const MAX: f64 = 1.0;
}

/// Dataset directory layout.
pub mod dataset {
    /// Subdirectory for tile images.
    pub const IMAGES_DIR: &str = "images";
    /// Subdirectory for label files.
    pub const LABELS_DIR: &str = "labels";
    /// File name prefix for tile outputs.
    pub const TILE_PREFIX: &str = "patch";
    /// Tile image extension.
    pub const IMAGE_EXTENSION: &str = "png";
    /// Label file extension.
    pub const LABEL_EXTENSION: &str = "txt";
}

/// World file sidecar extensions, tried in order.
///
/// The generic `<ext>w` form (e.g. `.tifw`) is tried after these.
pub const WORLD_FILE_EXTENSIONS: &[&str] = &["tfw", "pgw", "jgw", "wld"];

/// Extensions opened with the windowed GeoTIFF reader.
pub const GEOTIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// Decoded GeoTIFF strips/tiles kept in memory per raster (256 MiB).
pub const CHUNK_CACHE_BYTES: usize = 256 * 1024 * 1024;

/// Output file extensions by format.
pub mod output_extensions {
    /// GeoJSON output extension.
    pub const GEOJSON: &str = "geojson";
    /// CSV output extension.
    pub const CSV: &str = "csv";
}

/// Decimal places used when writing normalized label values.
pub const LABEL_DECIMAL_PLACES: usize = 6;

/// Decimal places for confidence formatting.
pub const CONFIDENCE_DECIMAL_PLACES: usize = 4;
