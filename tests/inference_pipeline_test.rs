//! Integration tests for tiled detection with cross-tile deduplication.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use geotiler::config::TilingConfig;
use geotiler::detection::{Detector, LocalDetection, NormalizedBox, TileImage};
use geotiler::geo::{Affine, SpatialRef};
use geotiler::pipeline::{CancelToken, InferenceOptions, run_detection};
use geotiler::raster::{MemoryRaster, RasterExtent};
use geotiler::{Error, Result};

/// Reports every bright blob that lies fully inside the tile.
///
/// Blobs are axis-aligned squares of value 255 in the first channel; the
/// scene is built so that no two blobs share a tile row or column.
struct BlobDetector;

impl Detector for BlobDetector {
    fn detect(&self, image: &TileImage, _confidence_threshold: f32) -> Result<Vec<LocalDetection>> {
        let size = image.size as usize;
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for row in 0..size {
            for col in 0..size {
                if image.get(row, col, 0) == 255 {
                    bounds = Some(bounds.map_or((col, row, col, row), |(x0, y0, x1, y1)| {
                        (x0.min(col), y0.min(row), x1.max(col), y1.max(row))
                    }));
                }
            }
        }

        let mut detections = vec![LocalDetection {
            bbox: NormalizedBox::new(0.0, 0.0, 0.5, 0.5),
            confidence: 0.1,
            class_id: 0,
        }];
        if let Some((x0, y0, x1, y1)) = bounds
            && x0 > 0
            && y0 > 0
            && x1 < size - 1
            && y1 < size - 1
        {
            #[allow(clippy::cast_precision_loss)]
            let n = |v: usize| v as f32 / size as f32;
            detections.push(LocalDetection {
                bbox: NormalizedBox::new(n(x0), n(y0), n(x1 + 1), n(y1 + 1)),
                confidence: 0.9,
                class_id: 0,
            });
        }
        Ok(detections)
    }

    fn name(&self) -> &str {
        "blobs"
    }
}

/// Fails on every tile that shows any part of a blob.
struct BlobIntolerantDetector;

impl Detector for BlobIntolerantDetector {
    fn detect(&self, image: &TileImage, _confidence_threshold: f32) -> Result<Vec<LocalDetection>> {
        if image.data.contains(&255) {
            return Err(Error::Inference {
                reason: "saturated input".to_string(),
            });
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "blob-intolerant"
    }
}

/// Fails on every tile.
struct BrokenDetector;

impl Detector for BrokenDetector {
    fn detect(&self, _image: &TileImage, _confidence_threshold: f32) -> Result<Vec<LocalDetection>> {
        Err(Error::Inference {
            reason: "session crashed".to_string(),
        })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// 256x256 RGB scene with one 20px blob at (100, 100).
fn scene(bands: usize) -> MemoryRaster {
    let (width, height) = (256usize, 256usize);
    let mut data = vec![0u8; bands * width * height];
    for row in 100..120 {
        for col in 100..120 {
            for band in 0..bands {
                data[(band * height + row) * width + col] = 255;
            }
        }
    }
    let extent = RasterExtent {
        width: 256,
        height: 256,
        transform: Affine::north_up(500_000.0, 4_000_000.0, 0.5, 0.5),
        spatial_ref: Some(SpatialRef::parse("EPSG:32630")),
    };
    MemoryRaster::new(extent, bands, data).unwrap()
}

fn options() -> InferenceOptions {
    InferenceOptions {
        tiling: TilingConfig {
            patch_size: 128,
            stride: 64,
        },
        confidence_threshold: 0.25,
        iou_threshold: 0.5,
        class_names: vec!["burrow".to_string()],
        progress: false,
        fail_fast: false,
    }
}

#[test]
fn test_cross_tile_duplicates_merge() {
    let output = run_detection(&scene(3), &BlobDetector, &options(), &CancelToken::new()).unwrap();

    // Origins 0, 64, 128, 192 on each axis; the blob is whole in the four
    // tiles starting at 0 or 64.
    assert_eq!(output.summary.tiles_total, 16);
    assert_eq!(output.summary.tiles_processed, 16);
    assert_eq!(output.summary.raw_detections, 4);
    assert_eq!(output.summary.kept_detections, 1);

    let feature = &output.features[0];
    assert_eq!(feature.class_name, "burrow");
    assert_eq!(feature.confidence, 0.9);
    assert!((feature.pixel_box.x_min - 100.0).abs() < 1e-4);
    assert!((feature.pixel_box.y_max - 120.0).abs() < 1e-4);

    let (min_x, min_y, max_x, max_y) = feature.geo_bounds();
    assert!((min_x - 500_050.0).abs() < 1e-3);
    assert!((max_x - 500_060.0).abs() < 1e-3);
    assert!((min_y - 3_999_940.0).abs() < 1e-3);
    assert!((max_y - 3_999_950.0).abs() < 1e-3);
}

#[test]
fn test_low_confidence_detections_are_filtered() {
    let mut opts = options();
    opts.confidence_threshold = 0.05;
    let output = run_detection(&scene(3), &BlobDetector, &opts, &CancelToken::new()).unwrap();
    // Corner boxes of neighbouring tiles only touch, so all 16 survive.
    assert_eq!(output.summary.raw_detections, 20);
    assert_eq!(output.features.len(), 17);
    assert_eq!(output.features[0].confidence, 0.9);
}

#[test]
fn test_cancelled_run_produces_no_output() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = run_detection(&scene(3), &BlobDetector, &options(), &cancel).unwrap_err();
    assert!(matches!(err, Error::Interrupted));
}

#[test]
fn test_failing_tiles_are_skipped() {
    let output =
        run_detection(&scene(3), &BlobIntolerantDetector, &options(), &CancelToken::new()).unwrap();
    // Tiles at origin 0 or 64 on both axes overlap the blob.
    assert_eq!(output.summary.tiles_processed, 12);
    assert_eq!(output.summary.tiles_skipped, 4);
    assert!(output.features.is_empty());
}

#[test]
fn test_every_tile_failing_is_an_error() {
    let err = run_detection(&scene(3), &BrokenDetector, &options(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, Error::NoTilesProcessed { skipped: 16 }));
}

#[test]
fn test_two_band_raster_processes_no_tiles() {
    let err = run_detection(&scene(2), &BlobDetector, &options(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, Error::NoTilesProcessed { skipped: 16 }));
}

#[test]
fn test_two_band_tiles_fail_fast() {
    let mut opts = options();
    opts.fail_fast = true;
    let err = run_detection(&scene(2), &BlobDetector, &opts, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, Error::ChannelMismatch { bands: 2 }));
}

#[test]
fn test_single_band_raster_is_replicated() {
    let output = run_detection(&scene(1), &BlobDetector, &options(), &CancelToken::new()).unwrap();
    assert_eq!(output.summary.kept_detections, 1);
}
