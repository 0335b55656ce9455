//! ONNX Runtime detector for YOLOv8-style exports.

use crate::detection::channels::TileImage;
use crate::detection::nms::suppress;
use crate::constants::DETECTOR_CHANNELS;
use crate::detection::{Detector, LocalDetection, NormalizedBox};
use crate::error::{Error, Result};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, trace};

/// Box coordinates preceding the class scores in each output column.
const BOX_FEATURES: usize = 4;

/// Check a model input shape against `[1, 3, input_size, input_size]`.
///
/// Dynamic axes (negative sizes) match anything.
pub fn check_input_shape(dims: &[i64], input_size: u32) -> Result<()> {
    #[allow(clippy::cast_possible_wrap)]
    let expected = [1, DETECTOR_CHANNELS as i64, i64::from(input_size), i64::from(input_size)];
    let matches = dims.len() == expected.len()
        && dims.iter().zip(expected).all(|(&dim, want)| dim < 0 || dim == want);
    if matches {
        return Ok(());
    }
    Err(Error::DetectorBuild {
        reason: format!(
            "model input shape {dims:?} does not match [1, {DETECTOR_CHANNELS}, {input_size}, {input_size}] (patch size {input_size})"
        ),
    })
}

/// Detector backed by an ONNX model with a `[1, 4 + classes, anchors]` output.
///
/// The session is shared by all tile workers; runs are serialized.
pub struct OnnxDetector {
    session: Mutex<Session>,
    input_size: u32,
    iou_threshold: f32,
    name: String,
}

impl fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("name", &self.name)
            .field("input_size", &self.input_size)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

fn build_error(e: impl fmt::Display) -> Error {
    Error::DetectorBuild {
        reason: e.to_string(),
    }
}

fn inference_error(e: impl fmt::Display) -> Error {
    Error::Inference {
        reason: e.to_string(),
    }
}

impl OnnxDetector {
    /// Load a model.
    ///
    /// # Arguments
    ///
    /// * `model_path` - ONNX file
    /// * `input_size` - Square input edge the model expects (the patch size)
    /// * `iou_threshold` - Per-tile, per-class NMS threshold
    pub fn from_file(model_path: &Path, input_size: u32, iou_threshold: f32) -> Result<Self> {
        if !model_path.is_file() {
            return Err(Error::ModelFileNotFound {
                path: model_path.to_path_buf(),
            });
        }

        #[cfg_attr(feature = "cuda", allow(unused_mut))]
        let mut builder = Session::builder()
            .map_err(build_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(build_error)?;

        #[cfg(feature = "cuda")]
        let mut builder = builder
            .with_execution_providers([
                ort::execution_providers::CUDAExecutionProvider::default().build(),
            ])
            .map_err(build_error)?;

        let session = builder.commit_from_file(model_path).map_err(build_error)?;

        let input = session.inputs().first().ok_or_else(|| Error::DetectorBuild {
            reason: "model has no inputs".to_string(),
        })?;
        let dims: Vec<i64> = input
            .dtype()
            .tensor_shape()
            .ok_or_else(|| Error::DetectorBuild {
                reason: "model input is not a tensor".to_string(),
            })?
            .iter()
            .copied()
            .collect();
        check_input_shape(&dims, input_size)?;

        let name = model_path
            .file_stem()
            .map_or_else(|| "onnx".to_string(), |s| s.to_string_lossy().into_owned());
        info!(
            "Loaded detector '{name}' from {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_size,
            iou_threshold,
            name,
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &TileImage, confidence_threshold: f32) -> Result<Vec<LocalDetection>> {
        if image.size != self.input_size {
            return Err(Error::Inference {
                reason: format!(
                    "tile is {}px but model expects {}px",
                    image.size, self.input_size
                ),
            });
        }

        let size = self.input_size as usize;
        let input = Tensor::from_array(([1usize, 3, size, size], image.to_chw_f32()))
            .map_err(inference_error)?;

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "detector session lock poisoned".to_string(),
        })?;
        let outputs = session.run(ort::inputs![input]).map_err(inference_error)?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;

        decode_yolo(
            shape,
            data,
            self.input_size,
            confidence_threshold,
            self.iou_threshold,
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Decode a `[1, 4 + classes, anchors]` prediction tensor.
///
/// Each anchor column holds `cx, cy, w, h` in input pixels followed by one
/// score per class. The best class above `confidence_threshold` is kept,
/// boxes are normalized to the input size and clipped to the tile, then
/// suppressed per class at `iou_threshold`.
pub fn decode_yolo(
    shape: &[i64],
    data: &[f32],
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<LocalDetection>> {
    let dims: Vec<usize> = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::Inference {
            reason: format!("negative dimension in output shape {shape:?}"),
        })?;

    let [1, features, anchors] = dims.as_slice() else {
        return Err(Error::Inference {
            reason: format!("expected output shape [1, 4 + classes, anchors], got {shape:?}"),
        });
    };
    let (features, anchors) = (*features, *anchors);
    if features <= BOX_FEATURES || data.len() != features * anchors {
        return Err(Error::Inference {
            reason: format!(
                "output shape {shape:?} does not match {} values",
                data.len()
            ),
        });
    }

    let at = |feature: usize, anchor: usize| data[feature * anchors + anchor];
    #[allow(clippy::cast_precision_loss)]
    let scale = input_size as f32;
    let mut candidates = Vec::new();

    for anchor in 0..anchors {
        let Some((class, score)) = (BOX_FEATURES..features)
            .map(|f| (f - BOX_FEATURES, at(f, anchor)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        if score < confidence_threshold {
            continue;
        }

        let (cx, cy) = (at(0, anchor), at(1, anchor));
        let (w, h) = (at(2, anchor), at(3, anchor));
        let bbox = NormalizedBox::new(
            ((cx - w / 2.0) / scale).clamp(0.0, 1.0),
            ((cy - h / 2.0) / scale).clamp(0.0, 1.0),
            ((cx + w / 2.0) / scale).clamp(0.0, 1.0),
            ((cy + h / 2.0) / scale).clamp(0.0, 1.0),
        );

        #[allow(clippy::cast_possible_truncation)]
        candidates.push(LocalDetection {
            bbox,
            confidence: score,
            class_id: class as u32,
        });
    }

    let before = candidates.len();
    let kept = suppress(
        candidates,
        f64::from(iou_threshold),
        |d| d.confidence,
        |a, b| {
            if a.class_id == b.class_id {
                a.bbox.to_pixels(1.0, (0.0, 0.0)).iou(&b.bbox.to_pixels(1.0, (0.0, 0.0)))
            } else {
                0.0
            }
        },
    );
    trace!("Decoded {} candidate(s), {} after per-tile NMS", before, kept.len());
    Ok(kept)
}
