//! Raster sources.

pub mod geotiff;
mod open;
mod source;
pub mod world_file;

pub use geotiff::GeoTiffRaster;
pub use open::{open_image, open_raster};
pub use source::{MemoryRaster, PixelWindow, RasterExtent, RasterSource};
