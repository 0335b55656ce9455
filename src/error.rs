//! Error types for geotiler.

use std::path::PathBuf;

/// Result type alias for geotiler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for geotiler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Failed to open or decode the raster.
    #[error("failed to open raster '{path}'")]
    RasterOpen {
        /// Path to the raster file.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// Failed to decode a GeoTIFF.
    #[error("failed to read GeoTIFF '{path}'")]
    GeoTiffRead {
        /// Path to the raster file.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: tiff::TiffError,
    },

    /// Raster layout the windowed reader cannot serve.
    #[error("unsupported raster '{path}': {message}")]
    UnsupportedRaster {
        /// Path to the raster file.
        path: PathBuf,
        /// Description of the layout.
        message: String,
    },

    /// Raster has neither GeoTIFF tags nor a world file.
    #[error(
        "no georeferencing found for raster '{path}' (expected GeoTIFF tags or a world file such as '.tfw', '.pgw' or '.wld')"
    )]
    MissingGeoreference {
        /// Path to the raster file.
        path: PathBuf,
    },

    /// World file exists but is malformed.
    #[error("invalid world file '{path}': {message}")]
    WorldFileParse {
        /// Path to the world file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Affine transform has no inverse.
    #[error("raster transform is not invertible (determinant {determinant})")]
    NonInvertibleTransform {
        /// Determinant of the linear part.
        determinant: f64,
    },

    /// Failed to read annotation file.
    #[error("failed to read annotation file '{path}'")]
    AnnotationRead {
        /// Path to the annotation file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse annotation file.
    #[error("failed to parse annotation file '{path}'")]
    AnnotationParse {
        /// Path to the annotation file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Raster and annotations use different spatial references and one cannot be resolved.
    #[error(
        "spatial reference mismatch: raster is {raster}, annotations are {annotations} ({reason})"
    )]
    SpatialReferenceMismatch {
        /// Raster spatial reference.
        raster: String,
        /// Annotation spatial reference.
        annotations: String,
        /// Why the annotations cannot be reprojected.
        reason: String,
    },

    /// A coordinate could not be transformed between spatial references.
    #[error("failed to reproject ({x}, {y}) from {from} to {to}: {reason}")]
    Reprojection {
        /// Source spatial reference.
        from: String,
        /// Target spatial reference.
        to: String,
        /// Source x.
        x: f64,
        /// Source y.
        y: f64,
        /// Description of the failure.
        reason: String,
    },

    /// Tile does not have a usable channel layout for the detector.
    #[error("tile has {bands} band(s), detector needs 1 or at least 3")]
    ChannelMismatch {
        /// Number of bands in the tile.
        bands: usize,
    },

    /// Failed to write a tile image.
    #[error("failed to write tile image '{path}'")]
    TileWrite {
        /// Path to the image file.
        path: PathBuf,
        /// Underlying encode error.
        #[source]
        source: image::ImageError,
    },

    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: PathBuf,
    },

    /// Failed to build the detector.
    #[error("failed to build detector: {reason}")]
    DetectorBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Every tile failed, so no detection result exists.
    #[error("all {skipped} tile(s) failed; no detections were produced")]
    NoTilesProcessed {
        /// Tiles skipped because of tile errors.
        skipped: usize,
    },

    /// Failed to write an output file.
    #[error("failed to write output file '{path}'")]
    OutputWrite {
        /// Path to the output file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("failed to serialize JSON output")]
    JsonSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Run was interrupted before all tiles were processed.
    #[error("interrupted")]
    Interrupted,

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether this error only affects the tile it happened on.
    pub const fn is_tile_local(&self) -> bool {
        matches!(
            self,
            Self::ChannelMismatch { .. } | Self::TileWrite { .. } | Self::Inference { .. }
        )
    }
}
