//! Request handlers.

pub mod analyze;
pub mod health;
pub mod predict;

pub use analyze::analyze_video;
pub use health::{health, ready};
pub use predict::predict;

use crate::error::{ApiError, ApiResult};

/// Parse a confidence threshold form field.
pub(crate) fn parse_confidence(raw: &str) -> ApiResult<f32> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid confidence value: {raw}")))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ApiError::bad_request(format!(
            "Confidence must be between 0 and 1, got {value}"
        )));
    }
    Ok(value)
}

/// Parse a sampling interval form field.
pub(crate) fn parse_interval(raw: &str) -> ApiResult<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid interval value: {raw}")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(ApiError::bad_request(format!(
            "Interval must be a positive number of seconds, got {value}"
        )));
    }
    Ok(value)
}
