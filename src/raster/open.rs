//! Opening georeferenced rasters.

use crate::constants::GEOTIFF_EXTENSIONS;
use crate::error::{Error, Result};
use crate::geo::SpatialRef;
use crate::raster::world_file::read_world_file;
use crate::raster::{GeoTiffRaster, MemoryRaster, RasterExtent, RasterSource};
use image::{ColorType, DynamicImage, ImageError, ImageReader};
use std::path::Path;
use tracing::{debug, info};

/// Open a georeferenced raster.
///
/// `.tif`/`.tiff` files are read window by window with their GeoTIFF tags
/// (or a world file). Any other format the `image` crate decodes is loaded
/// whole and georeferenced by its world file. `spatial_ref`, when given,
/// overrides whatever the file declares.
pub fn open_raster(path: &Path, spatial_ref: Option<SpatialRef>) -> Result<Box<dyn RasterSource>> {
    let is_geotiff = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| GEOTIFF_EXTENSIONS.iter().any(|g| ext.eq_ignore_ascii_case(g)));

    if is_geotiff {
        return Ok(Box::new(GeoTiffRaster::open(path, spatial_ref)?));
    }
    Ok(Box::new(open_image(path, spatial_ref)?))
}

/// Decode a whole image with a world file sidecar.
///
/// Samples are reduced to 8 bits; the band count follows the source
/// (gray, gray+alpha, RGB, RGBA).
pub fn open_image(path: &Path, spatial_ref: Option<SpatialRef>) -> Result<MemoryRaster> {
    let transform = read_world_file(path)?;
    debug!("Raster transform: {transform:?}");

    let open_error = |e: ImageError| Error::RasterOpen {
        path: path.to_path_buf(),
        source: e,
    };
    let mut reader = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| open_error(ImageError::IoError(e)))?;
    // Orthomosaics routinely exceed the decoder's default allocation limit.
    reader.no_limits();
    let img = reader.decode().map_err(open_error)?;

    let (width, height) = (img.width(), img.height());
    let (bands, samples) = to_samples(img);

    info!(
        "Opened raster {} ({}x{}, {} band(s), {})",
        path.display(),
        width,
        height,
        bands,
        spatial_ref
            .as_ref()
            .map_or_else(|| "unknown CRS".to_string(), ToString::to_string)
    );

    let extent = RasterExtent {
        width,
        height,
        transform,
        spatial_ref,
    };
    MemoryRaster::from_interleaved(extent, bands, samples)
}

/// Interleaved 8-bit samples and their band count.
fn to_samples(img: DynamicImage) -> (usize, Vec<u8>) {
    match img.color() {
        ColorType::L8 | ColorType::L16 => (1, img.into_luma8().into_raw()),
        ColorType::La8 | ColorType::La16 => (2, img.into_luma_alpha8().into_raw()),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => (4, img.into_rgba8().into_raw()),
        _ => (3, img.into_rgb8().into_raw()),
    }
}
