//! Conversion of raster windows into detector input images.

use crate::constants::DETECTOR_CHANNELS;
use crate::error::{Error, Result};
use crate::raster::PixelWindow;
use image::RgbImage;

/// A square 3-channel tile ready for a detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    /// Edge length in pixels.
    pub size: u32,
    /// Interleaved RGB samples, row-major.
    pub data: Vec<u8>,
}

impl TileImage {
    /// Sample at `(row, col, channel)`.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> u8 {
        let size = self.size as usize;
        self.data[(row * size + col) * DETECTOR_CHANNELS + channel]
    }

    /// Copy into an `image` buffer for encoding.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.size, self.size, self.data.clone())
    }

    /// Planar `(3, size, size)` float tensor scaled to `[0, 1]`.
    pub fn to_chw_f32(&self) -> Vec<f32> {
        let plane = (self.size as usize).pow(2);
        let mut out = vec![0.0; DETECTOR_CHANNELS * plane];
        for (i, px) in self.data.chunks_exact(DETECTOR_CHANNELS).enumerate() {
            for (c, &v) in px.iter().enumerate() {
                out[c * plane + i] = f32::from(v) / 255.0;
            }
        }
        out
    }
}

/// Map a square window to exactly three channels.
///
/// A single band is repeated into all three channels and extra bands past
/// the third are dropped. Any other band count (two) is rejected for this
/// tile only.
pub fn to_rgb(window: &PixelWindow) -> Result<TileImage> {
    let sources: [usize; DETECTOR_CHANNELS] = match window.bands {
        1 => [0, 0, 0],
        n if n >= DETECTOR_CHANNELS => [0, 1, 2],
        n => return Err(Error::ChannelMismatch { bands: n }),
    };
    if window.width != window.height {
        return Err(Error::Internal {
            message: format!(
                "tile window must be square, got {}x{}",
                window.width, window.height
            ),
        });
    }

    let plane = window.width * window.height;
    let mut data = Vec::with_capacity(plane * DETECTOR_CHANNELS);
    for i in 0..plane {
        for &band in &sources {
            data.push(window.data[band * plane + i]);
        }
    }

    Ok(TileImage {
        size: u32::try_from(window.width).map_err(|_| Error::Internal {
            message: format!("tile width {} out of range", window.width),
        })?,
        data,
    })
}
