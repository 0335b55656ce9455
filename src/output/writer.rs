//! Output writer trait definition.

use crate::error::Result;
use crate::output::GeoFeature;

/// Trait for writing detection features.
pub trait OutputWriter {
    /// Write the file header (if applicable).
    fn write_header(&mut self) -> Result<()>;

    /// Write a single feature.
    fn write_feature(&mut self, feature: &GeoFeature) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}
