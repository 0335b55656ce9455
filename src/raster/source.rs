//! Raster access used by the tiling pipeline.

use crate::error::{Error, Result};
use crate::geo::{Affine, CoordinateMapper, SpatialRef};

/// Size, georeferencing and spatial reference of an opened raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterExtent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel to geographic transform.
    pub transform: Affine,
    /// Spatial reference, if known.
    pub spatial_ref: Option<SpatialRef>,
}

impl RasterExtent {
    /// Coordinate mapper for this raster.
    pub fn mapper(&self) -> Result<CoordinateMapper> {
        CoordinateMapper::new(self.transform)
    }
}

/// A block of pixels in planar `(bands, height, width)` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelWindow {
    /// Number of bands.
    pub bands: usize,
    /// Window width.
    pub width: usize,
    /// Window height.
    pub height: usize,
    /// Samples, band after band, each band row-major.
    pub data: Vec<u8>,
}

impl PixelWindow {
    /// All-zero window.
    pub fn zeros(bands: usize, width: usize, height: usize) -> Self {
        Self {
            bands,
            width,
            height,
            data: vec![0; bands * width * height],
        }
    }

    /// One band as a row-major slice.
    pub fn band(&self, band: usize) -> &[u8] {
        let plane = self.width * self.height;
        &self.data[band * plane..(band + 1) * plane]
    }

    /// Sample at `(band, row, col)`.
    pub fn get(&self, band: usize, row: usize, col: usize) -> u8 {
        self.data[(band * self.height + row) * self.width + col]
    }
}

/// Source of raster windows.
///
/// Implementations must be shareable across tile workers.
pub trait RasterSource: Send + Sync {
    /// Raster extent.
    fn extent(&self) -> &RasterExtent;

    /// Number of bands.
    fn bands(&self) -> usize;

    /// Read a `width x height` window at `(x, y)`.
    ///
    /// Parts of the window outside the raster are zero-filled, so the
    /// returned window always has the requested size.
    fn read_window(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelWindow>;
}

/// Fully decoded raster held in memory, pixel-interleaved.
///
/// Used for formats without random access; windows are transposed to
/// planar layout as they are read.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    extent: RasterExtent,
    bands: usize,
    data: Vec<u8>,
}

impl MemoryRaster {
    /// Build from planar `(bands, height, width)` samples.
    pub fn new(extent: RasterExtent, bands: usize, planar: Vec<u8>) -> Result<Self> {
        check_len(&extent, bands, planar.len())?;
        let pixels = extent.width as usize * extent.height as usize;
        let mut data = vec![0; planar.len()];
        for (b, plane) in planar.chunks_exact(pixels).enumerate() {
            for (i, &v) in plane.iter().enumerate() {
                data[i * bands + b] = v;
            }
        }
        Ok(Self {
            extent,
            bands,
            data,
        })
    }

    /// Take ownership of pixel-interleaved samples (`RGBRGB…`).
    pub fn from_interleaved(extent: RasterExtent, bands: usize, data: Vec<u8>) -> Result<Self> {
        check_len(&extent, bands, data.len())?;
        Ok(Self {
            extent,
            bands,
            data,
        })
    }
}

fn check_len(extent: &RasterExtent, bands: usize, len: usize) -> Result<()> {
    let expected = bands * extent.width as usize * extent.height as usize;
    if bands == 0 || len != expected {
        return Err(Error::Internal {
            message: format!(
                "raster buffer has {len} samples, expected {expected} for {bands} band(s) of {}x{}",
                extent.width, extent.height
            ),
        });
    }
    Ok(())
}

impl RasterSource for MemoryRaster {
    fn extent(&self) -> &RasterExtent {
        &self.extent
    }

    fn bands(&self) -> usize {
        self.bands
    }

    fn read_window(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelWindow> {
        let (w, h) = (width as usize, height as usize);
        let mut window = PixelWindow::zeros(self.bands, w, h);

        let raster_w = self.extent.width as usize;
        let raster_h = self.extent.height as usize;
        let (x0, y0) = (x as usize, y as usize);
        if x0 >= raster_w || y0 >= raster_h {
            return Ok(window);
        }

        let copy_w = w.min(raster_w - x0);
        let copy_h = h.min(raster_h - y0);
        for row in 0..copy_h {
            let src_row = ((y0 + row) * raster_w + x0) * self.bands;
            let pixels = &self.data[src_row..src_row + copy_w * self.bands];
            for (col, px) in pixels.chunks_exact(self.bands).enumerate() {
                for (b, &v) in px.iter().enumerate() {
                    window.data[(b * h + row) * w + col] = v;
                }
            }
        }

        Ok(window)
    }
}
