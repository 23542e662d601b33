//! Error types for detection.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;

/// Errors that can occur while loading or running the detector.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to initialize inference session: {0}")]
    SessionInit(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid model output: {0}")]
    InvalidOutput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DetectError {
    pub fn session_init(message: impl Into<String>) -> Self {
        Self::SessionInit(message.into())
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
