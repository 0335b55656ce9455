//! Processing pipeline components.

mod cancel;
mod dataset;
mod inference;

pub use cancel::CancelToken;
pub use dataset::{DatasetOptions, DatasetSummary, create_dataset};
pub use inference::{DetectionOutput, InferenceOptions, InferenceSummary, run_detection};
