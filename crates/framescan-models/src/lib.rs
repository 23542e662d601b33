//! Shared data models for the Framescan backend.
//!
//! This crate provides Serde-serializable types for:
//! - Detections and pixel-space bounding boxes
//! - Per-frame analysis records and the full video analysis report
//! - The frame sampling plan derived from source fps and interval

pub mod bbox;
pub mod detection;
pub mod report;
pub mod sampling;

// Re-export common types
pub use bbox::BoundingBox;
pub use detection::Detection;
pub use report::{AnalysisReport, FrameRecord, ReportError};
pub use sampling::{SamplingError, SamplingPlan};
