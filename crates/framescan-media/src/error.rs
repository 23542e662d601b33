//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Source unreadable: {message}")]
    SourceUnreadable {
        message: String,
        stderr: Option<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a source-unreadable error.
    pub fn source_unreadable(message: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            message: message.into(),
            stderr: None,
        }
    }

    /// Create a source-unreadable error carrying tool stderr.
    pub fn source_unreadable_with_stderr(message: impl Into<String>, stderr: String) -> Self {
        Self::SourceUnreadable {
            message: message.into(),
            stderr: Some(stderr),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
