//! Tile detection, global assembly and cross-tile deduplication.

mod assembler;
pub mod channels;
mod nms;
mod onnx;
mod runner;
mod types;

pub use assembler::GlobalAssembler;
pub use channels::{TileImage, to_rgb};
pub use nms::Deduplicator;
pub use onnx::{OnnxDetector, check_input_shape, decode_yolo};
pub use runner::{DetectionRunner, Detector};
pub use types::{GlobalDetection, LocalDetection, NormalizedBox, PixelBox, RawDetection};
