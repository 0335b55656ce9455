//! Windowed GeoTIFF access.
//!
//! Only the strips or tiles a window touches are decoded, so rasters far
//! larger than memory can be tiled. Georeferencing comes from the
//! `ModelTransformation` tag, or `ModelTiepoint` plus `ModelPixelScale`,
//! with a world file as fallback. The EPSG code is taken from the
//! GeoKey directory when the caller does not supply a spatial reference.

use crate::constants::CHUNK_CACHE_BYTES;
use crate::error::{Error, Result};
use crate::geo::{Affine, SpatialRef};
use crate::raster::world_file::read_world_file;
use crate::raster::{PixelWindow, RasterExtent, RasterSource};
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tiff::ColorType;
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, info};

/// GeoKey ids read from the key directory.
mod geo_key {
    pub const RASTER_TYPE: u16 = 1025;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const PROJECTED_CS_TYPE: u16 = 3072;
    pub const RASTER_PIXEL_IS_POINT: u16 = 2;
    pub const USER_DEFINED: u16 = 32767;
}

/// `PlanarConfiguration` value for band-separate storage.
const PLANAR_SEPARATE: u16 = 2;

/// Georeferencing keys of interest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoKeys {
    /// Tie points refer to pixel centres rather than corners.
    pub pixel_is_point: bool,
    /// Projected or geographic EPSG code.
    pub epsg: Option<u16>,
}

/// Decode a `GeoKeyDirectoryTag` value.
///
/// Only keys stored inline in the directory are read; a projected code
/// wins over a geographic one.
pub fn parse_geo_keys(directory: &[u16]) -> GeoKeys {
    let count = directory.get(3).copied().unwrap_or(0) as usize;
    let (mut projected, mut geographic) = (None, None);
    let mut keys = GeoKeys::default();

    for entry in directory.get(4..).unwrap_or_default().chunks_exact(4).take(count) {
        let &[id, location, _, value] = entry else {
            continue;
        };
        if location != 0 {
            continue;
        }
        match id {
            geo_key::RASTER_TYPE => keys.pixel_is_point = value == geo_key::RASTER_PIXEL_IS_POINT,
            geo_key::PROJECTED_CS_TYPE => projected = Some(value),
            geo_key::GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }

    keys.epsg = projected
        .or(geographic)
        .filter(|&code| code != 0 && code != geo_key::USER_DEFINED);
    keys
}

/// Corner-based transform from GeoTIFF model tags.
///
/// `transformation` is the row-major 4x4 `ModelTransformationTag`;
/// otherwise the first tie point and the pixel scale are used.
pub fn geotransform(
    transformation: Option<&[f64]>,
    scale: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
    pixel_is_point: bool,
) -> Option<Affine> {
    let t = if let Some(&[a, b, _, c, d, e, _, f, ..]) = transformation {
        Affine { a, b, c, d, e, f }
    } else if let (Some(&[sx, sy, ..]), Some(&[i, j, _, x, y, ..])) = (scale, tiepoint) {
        Affine {
            a: sx,
            b: 0.0,
            c: sx.mul_add(-i, x),
            d: 0.0,
            e: -sy,
            f: sy.mul_add(j, y),
        }
    } else {
        return None;
    };

    if !pixel_is_point {
        return Some(t);
    }
    Some(Affine {
        c: t.c - t.a / 2.0 - t.b / 2.0,
        f: t.f - t.d / 2.0 - t.e / 2.0,
        ..t
    })
}

/// Decoded chunks kept for neighbouring windows, bounded by total bytes.
#[derive(Debug)]
struct ChunkCache {
    capacity: usize,
    bytes: usize,
    order: VecDeque<u32>,
    chunks: HashMap<u32, Arc<Vec<u8>>>,
}

impl ChunkCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            bytes: 0,
            order: VecDeque::new(),
            chunks: HashMap::new(),
        }
    }

    fn get(&self, index: u32) -> Option<Arc<Vec<u8>>> {
        self.chunks.get(&index).cloned()
    }

    fn insert(&mut self, index: u32, chunk: Arc<Vec<u8>>) {
        if self.chunks.contains_key(&index) {
            return;
        }
        self.bytes += chunk.len();
        self.order.push_back(index);
        self.chunks.insert(index, chunk);

        while self.bytes > self.capacity && self.order.len() > 1 {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.chunks.remove(&oldest) {
                self.bytes -= evicted.len();
            }
        }
    }
}

/// GeoTIFF raster read chunk by chunk.
pub struct GeoTiffRaster {
    path: PathBuf,
    extent: RasterExtent,
    bands: usize,
    sixteen_bit: bool,
    chunk_width: u32,
    chunk_height: u32,
    chunks_across: u32,
    decoder: Mutex<Decoder<BufReader<File>>>,
    cache: Mutex<ChunkCache>,
}

impl std::fmt::Debug for GeoTiffRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffRaster")
            .field("path", &self.path)
            .field("extent", &self.extent)
            .field("bands", &self.bands)
            .field("chunk", &(self.chunk_width, self.chunk_height))
            .finish_non_exhaustive()
    }
}

impl GeoTiffRaster {
    /// Open a GeoTIFF and read its layout and georeferencing.
    ///
    /// An explicit `spatial_ref` overrides the file's EPSG code.
    pub fn open(path: &Path, spatial_ref: Option<SpatialRef>) -> Result<Self> {
        let tiff_error = |e: tiff::TiffError| Error::GeoTiffRead {
            path: path.to_path_buf(),
            source: e,
        };
        let unsupported = |message: String| Error::UnsupportedRaster {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| tiff_error(e.into()))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_error)?;

        let (width, height) = decoder.dimensions().map_err(tiff_error)?;
        let (bands, sixteen_bit) = match decoder.colortype().map_err(tiff_error)? {
            ColorType::Gray(8) => (1, false),
            ColorType::Gray(16) => (1, true),
            ColorType::GrayA(8) => (2, false),
            ColorType::GrayA(16) => (2, true),
            ColorType::RGB(8) => (3, false),
            ColorType::RGB(16) => (3, true),
            ColorType::RGBA(8) => (4, false),
            ColorType::RGBA(16) => (4, true),
            other => return Err(unsupported(format!("color type {other:?}"))),
        };

        let planar = decoder
            .find_tag_unsigned::<u16>(Tag::PlanarConfiguration)
            .map_err(tiff_error)?;
        if planar == Some(PLANAR_SEPARATE) {
            return Err(unsupported("band-separate (planar) sample layout".to_string()));
        }

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        if chunk_width == 0 || chunk_height == 0 {
            return Err(unsupported(format!("chunk size {chunk_width}x{chunk_height}")));
        }

        let keys = optional_tag(&mut decoder, Tag::GeoKeyDirectoryTag, Value::into_u16_vec)
            .map_err(tiff_error)?
            .map(|directory| parse_geo_keys(&directory))
            .unwrap_or_default();
        let transformation =
            optional_tag(&mut decoder, Tag::ModelTransformationTag, Value::into_f64_vec).map_err(tiff_error)?;
        let scale = optional_tag(&mut decoder, Tag::ModelPixelScaleTag, Value::into_f64_vec).map_err(tiff_error)?;
        let tiepoint = optional_tag(&mut decoder, Tag::ModelTiepointTag, Value::into_f64_vec).map_err(tiff_error)?;

        let transform = match geotransform(
            transformation.as_deref(),
            scale.as_deref(),
            tiepoint.as_deref(),
            keys.pixel_is_point,
        ) {
            Some(t) => t,
            None => {
                debug!("No GeoTIFF model tags in {}; trying a world file", path.display());
                read_world_file(path)?
            }
        };
        let spatial_ref = spatial_ref.or_else(|| keys.epsg.map(|code| SpatialRef::parse(&format!("EPSG:{code}"))));

        info!(
            "Opened GeoTIFF {} ({}x{}, {} band(s), {}x{} chunks, {})",
            path.display(),
            width,
            height,
            bands,
            chunk_width,
            chunk_height,
            spatial_ref
                .as_ref()
                .map_or_else(|| "unknown CRS".to_string(), ToString::to_string)
        );

        Ok(Self {
            path: path.to_path_buf(),
            extent: RasterExtent {
                width,
                height,
                transform,
                spatial_ref,
            },
            bands,
            sixteen_bit,
            chunk_width,
            chunk_height,
            chunks_across: width.div_ceil(chunk_width),
            decoder: Mutex::new(decoder),
            cache: Mutex::new(ChunkCache::new(CHUNK_CACHE_BYTES)),
        })
    }

    /// Interleaved 8-bit samples of one chunk, cropped to the raster.
    fn chunk(&self, index: u32) -> Result<Arc<Vec<u8>>> {
        let poisoned = || Error::Internal {
            message: format!("GeoTIFF reader lock poisoned for {}", self.path.display()),
        };
        if let Some(chunk) = self.cache.lock().map_err(|_| poisoned())?.get(index) {
            return Ok(chunk);
        }

        let decoded = {
            let mut decoder = self.decoder.lock().map_err(|_| poisoned())?;
            decoder.read_chunk(index).map_err(|e| Error::GeoTiffRead {
                path: self.path.clone(),
                source: e,
            })?
        };
        let samples = match decoded {
            DecodingResult::U8(data) if !self.sixteen_bit => data,
            #[allow(clippy::cast_possible_truncation)]
            DecodingResult::U16(data) if self.sixteen_bit => data.iter().map(|&v| (v >> 8) as u8).collect(),
            _ => {
                return Err(Error::UnsupportedRaster {
                    path: self.path.clone(),
                    message: "sample format differs from the declared color type".to_string(),
                });
            }
        };

        let chunk = Arc::new(samples);
        self.cache
            .lock()
            .map_err(|_| poisoned())?
            .insert(index, Arc::clone(&chunk));
        Ok(chunk)
    }
}

fn optional_tag<T>(
    decoder: &mut Decoder<BufReader<File>>,
    tag: Tag,
    convert: impl FnOnce(Value) -> tiff::TiffResult<T>,
) -> tiff::TiffResult<Option<T>> {
    decoder.find_tag(tag)?.map(convert).transpose()
}

impl RasterSource for GeoTiffRaster {
    fn extent(&self) -> &RasterExtent {
        &self.extent
    }

    fn bands(&self) -> usize {
        self.bands
    }

    fn read_window(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelWindow> {
        let (w, h) = (width as usize, height as usize);
        let mut window = PixelWindow::zeros(self.bands, w, h);

        let x_end = x.saturating_add(width).min(self.extent.width);
        let y_end = y.saturating_add(height).min(self.extent.height);
        if x >= x_end || y >= y_end {
            return Ok(window);
        }

        for chunk_row in y / self.chunk_height..=(y_end - 1) / self.chunk_height {
            for chunk_col in x / self.chunk_width..=(x_end - 1) / self.chunk_width {
                let index = chunk_row * self.chunks_across + chunk_col;
                let chunk = self.chunk(index)?;

                // Chunk origin and the size of its data inside the raster.
                let (cx, cy) = (chunk_col * self.chunk_width, chunk_row * self.chunk_height);
                let data_w = self.chunk_width.min(self.extent.width - cx) as usize;
                let data_h = self.chunk_height.min(self.extent.height - cy) as usize;
                // Edge tiles may come back cropped or padded to the full tile size.
                let stride = if chunk.len() == data_w * data_h * self.bands {
                    data_w
                } else if chunk.len() == (self.chunk_width * self.chunk_height) as usize * self.bands {
                    self.chunk_width as usize
                } else {
                    return Err(Error::UnsupportedRaster {
                        path: self.path.clone(),
                        message: format!(
                            "chunk {index} holds {} samples, expected {}",
                            chunk.len(),
                            data_w * data_h * self.bands
                        ),
                    });
                };

                let col_range = x.max(cx)..x_end.min(cx + self.chunk_width);
                for row in y.max(cy)..y_end.min(cy + self.chunk_height) {
                    let src_row = (row - cy) as usize * stride;
                    let dst_row = (row - y) as usize;
                    for col in col_range.clone() {
                        let src = (src_row + (col - cx) as usize) * self.bands;
                        let dst_col = (col - x) as usize;
                        for b in 0..self.bands {
                            window.data[(b * h + dst_row) * w + dst_col] = chunk[src + b];
                        }
                    }
                }
            }
        }

        Ok(window)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tiff::encoder::{TiffEncoder, colortype};

    const WIDTH: u32 = 40;
    const HEIGHT: u32 = 30;

    /// Red is `(col + row * 40) % 256`, green the row, blue the column.
    fn pixel(col: u32, row: u32) -> [u8; 3] {
        let r = u8::try_from((col + row * WIDTH) % 256).unwrap();
        [r, u8::try_from(row).unwrap(), u8::try_from(col).unwrap()]
    }

    /// Striped RGB GeoTIFF, 7 rows per strip, with optional model tags.
    fn write_tiff(path: &Path, georeferenced: bool) {
        let data: Vec<u8> = (0..HEIGHT)
            .flat_map(|row| (0..WIDTH).flat_map(move |col| pixel(col, row)))
            .collect();
        let mut tiff = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        let mut image = tiff.new_image::<colortype::RGB8>(WIDTH, HEIGHT).unwrap();
        image.rows_per_strip(7).unwrap();
        if georeferenced {
            let encoder = image.encoder();
            encoder
                .write_tag(Tag::ModelPixelScaleTag, &[0.5f64, 0.25, 0.0][..])
                .unwrap();
            encoder
                .write_tag(
                    Tag::ModelTiepointTag,
                    &[0.0f64, 0.0, 0.0, 440_000.0, 4_480_000.0, 0.0][..],
                )
                .unwrap();
            encoder
                .write_tag(
                    Tag::GeoKeyDirectoryTag,
                    &[1u16, 1, 0, 2, 1025, 0, 1, 1, 3072, 0, 1, 32630][..],
                )
                .unwrap();
        }
        image.write_data(&data).unwrap();
    }

    #[test]
    fn test_geotiff_tags_give_transform_and_crs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.tif");
        write_tiff(&path, true);

        let raster = GeoTiffRaster::open(&path, None).unwrap();
        let extent = raster.extent();
        assert_eq!((extent.width, extent.height), (WIDTH, HEIGHT));
        assert_eq!(raster.bands(), 3);
        assert_eq!(extent.transform, Affine::north_up(440_000.0, 4_480_000.0, 0.5, 0.25));
        assert_eq!(extent.spatial_ref, Some(SpatialRef::parse("EPSG:32630")));
    }

    #[test]
    fn test_explicit_crs_overrides_geokeys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.tif");
        write_tiff(&path, true);
        let raster = GeoTiffRaster::open(&path, Some(SpatialRef::parse("EPSG:25830"))).unwrap();
        assert_eq!(raster.extent().spatial_ref, Some(SpatialRef::parse("EPSG:25830")));
    }

    #[test]
    fn test_window_across_strips_and_edge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.tif");
        write_tiff(&path, true);
        let raster = GeoTiffRaster::open(&path, None).unwrap();

        // Rows 5..15 span three strips; columns 35..45 run past the right edge.
        let win = raster.read_window(35, 5, 10, 10).unwrap();
        assert_eq!((win.bands, win.width, win.height), (3, 10, 10));
        for row in 0..10u32 {
            for col in 0..10u32 {
                let expected = if col < 5 { pixel(35 + col, 5 + row) } else { [0, 0, 0] };
                for (b, &value) in expected.iter().enumerate() {
                    assert_eq!(win.get(b, row as usize, col as usize), value, "band {b} at ({col}, {row})");
                }
            }
        }

        // Last, partial strip and a second read served from the cache.
        let tail = raster.read_window(0, 28, 4, 4).unwrap();
        assert_eq!(tail.get(1, 1, 3), 29);
        assert_eq!(tail.get(0, 2, 0), 0);
        assert_eq!(raster.read_window(0, 28, 4, 4).unwrap(), tail);
    }

    #[test]
    fn test_world_file_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.tif");
        write_tiff(&path, false);
        std::fs::write(dir.path().join("plain.tfw"), "2.0\n0.0\n0.0\n-2.0\n101.0\n499.0\n").unwrap();

        let raster = GeoTiffRaster::open(&path, None).unwrap();
        assert_eq!(raster.extent().transform, Affine::north_up(100.0, 500.0, 2.0, 2.0));
        assert!(raster.extent().spatial_ref.is_none());
    }

    #[test]
    fn test_no_georeferencing_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.tif");
        write_tiff(&path, false);
        assert!(matches!(
            GeoTiffRaster::open(&path, None),
            Err(Error::MissingGeoreference { .. })
        ));
    }

    #[test]
    fn test_pixel_is_point_shifts_half_pixel() {
        let t = geotransform(None, Some(&[2.0, 2.0, 0.0]), Some(&[0.0, 0.0, 0.0, 101.0, 499.0, 0.0]), true).unwrap();
        assert_eq!(t, Affine::north_up(100.0, 500.0, 2.0, 2.0));
    }

    #[test]
    fn test_model_transformation_wins() {
        let matrix = [0.8, 0.6, 0.0, 10.0, 0.6, -0.8, 0.0, 20.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let t = geotransform(Some(&matrix), Some(&[9.0, 9.0, 0.0]), Some(&[0.0; 6]), false).unwrap();
        assert_eq!((t.a, t.b, t.c, t.d, t.e, t.f), (0.8, 0.6, 10.0, 0.6, -0.8, 20.0));
        assert!(geotransform(None, Some(&[1.0, 1.0, 0.0]), None, false).is_none());
    }

    #[test]
    fn test_parse_geo_keys() {
        let keys = parse_geo_keys(&[1, 1, 0, 3, 1025, 0, 1, 2, 2048, 0, 1, 4326, 3072, 0, 1, 32630]);
        assert_eq!(
            keys,
            GeoKeys {
                pixel_is_point: true,
                epsg: Some(32630)
            }
        );
        let user_defined = parse_geo_keys(&[1, 1, 0, 1, 3072, 0, 1, 32767]);
        assert_eq!(user_defined.epsg, None);
        assert_eq!(parse_geo_keys(&[]), GeoKeys::default());
    }

    #[test]
    fn test_chunk_cache_evicts_oldest() {
        let mut cache = ChunkCache::new(100);
        cache.insert(0, Arc::new(vec![0; 60]));
        cache.insert(1, Arc::new(vec![0; 30]));
        assert!(cache.get(0).is_some());
        cache.insert(2, Arc::new(vec![0; 30]));
        assert!(cache.get(0).is_none());
        assert!(cache.get(1).is_some() && cache.get(2).is_some());
        assert_eq!(cache.bytes, 60);
    }
}
