//! Object detection adapter for the Framescan backend.
//!
//! Wraps a YOLOv8 ONNX model behind the [`Detector`] trait:
//! - session construction with execution-provider fallback (CUDA/CoreML/CPU)
//! - preprocessing to the model's square input
//! - output decoding with per-class non-maximum suppression
//!
//! The detector is loaded once at process start and shared across requests;
//! a missing or unloadable model is a startup failure, never a per-request one.

pub mod detector;
pub mod error;
pub mod labels;

pub use detector::{Detector, ObjectDetector, ObjectDetectorConfig};
pub use error::{DetectError, DetectResult};
pub use labels::COCO_CLASSES;
