//! CSV output format writer.

use crate::constants::CONFIDENCE_DECIMAL_PLACES;
use crate::error::{Error, Result};
use crate::output::{GeoFeature, OutputWriter};
use std::fs::File;
use std::path::Path;

const HEADER: [&str; 11] = [
    "class",
    "class_id",
    "confidence",
    "min_x",
    "min_y",
    "max_x",
    "max_y",
    "pixel_x_min",
    "pixel_y_min",
    "pixel_x_max",
    "pixel_y_max",
];

/// CSV format output writer, one row per feature with its geographic bounds.
pub struct CsvWriter {
    writer: csv::Writer<File>,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            writer: csv::Writer::from_writer(file),
        })
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(HEADER)?;
        Ok(())
    }

    fn write_feature(&mut self, feature: &GeoFeature) -> Result<()> {
        let (min_x, min_y, max_x, max_y) = feature.geo_bounds();
        let b = feature.pixel_box;
        self.writer.write_record([
            feature.class_name.clone(),
            feature.class_id.to_string(),
            format!("{:.prec$}", feature.confidence, prec = CONFIDENCE_DECIMAL_PLACES),
            min_x.to_string(),
            min_y.to_string(),
            max_x.to_string(),
            max_y.to_string(),
            b.x_min.to_string(),
            b.y_min.to_string(),
            b.x_max.to_string(),
            b.y_max.to_string(),
        ])?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
