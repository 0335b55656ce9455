//! Output format writers.

mod csv;
mod geojson;
mod labels;
pub mod progress;
mod types;
mod writer;

pub use csv::CsvWriter;
pub use geojson::GeoJsonWriter;
pub use labels::{label_line, write_label_file};
pub use types::GeoFeature;
pub use writer::OutputWriter;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::geo::SpatialRef;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output path for a format: the given path when one format is written,
/// otherwise the same stem with the format's extension.
pub fn output_path_for(base: &Path, format: OutputFormat, formats: usize) -> PathBuf {
    if formats <= 1 && base.extension().is_some() {
        base.to_path_buf()
    } else {
        base.with_extension(format.extension())
    }
}

/// Write all features in one format.
pub fn write_features(
    path: &Path,
    format: OutputFormat,
    features: &[GeoFeature],
    spatial_ref: Option<&SpatialRef>,
) -> Result<()> {
    debug!("Writing {} output: {}", format, path.display());

    let mut writer: Box<dyn OutputWriter> = match format {
        OutputFormat::GeoJson => Box::new(GeoJsonWriter::new(path, spatial_ref.cloned())),
        OutputFormat::Csv => Box::new(CsvWriter::new(path)?),
    };

    writer.write_header()?;
    for feature in features {
        writer.write_feature(feature)?;
    }
    writer.finalize()
}
