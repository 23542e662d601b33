//! Video analysis handler.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;
use uuid::Uuid;

use framescan_models::AnalysisReport;

use crate::error::{ApiError, ApiResult};
use crate::handlers::{parse_confidence, parse_interval};
use crate::state::AppState;

/// Analyze an uploaded video at a fixed sampling interval.
///
/// The upload is staged to a scratch file that is removed when the request
/// finishes, success or not. Annotated frames persist under the frames
/// directory, namespaced by a per-request id.
pub async fn analyze_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalysisReport>> {
    let mut file: Option<Bytes> = None;
    let mut interval: Option<f64> = None;
    let mut confidence: Option<f32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
                file = Some(bytes);
            }
            "interval_seconds" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read field: {e}")))?;
                interval = Some(parse_interval(&text)?);
            }
            "confidence" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read field: {e}")))?;
                confidence = Some(parse_confidence(&text)?);
            }
            _ => {}
        }
    }

    let bytes = file.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    let interval = interval.unwrap_or(state.config.default_interval);
    let confidence = confidence.unwrap_or(state.config.default_confidence);

    // Scratch file is removed on drop, on every exit path.
    let scratch = tempfile::Builder::new()
        .prefix("framescan-upload-")
        .tempfile_in(&state.config.scratch_dir)
        .map_err(|e| ApiError::Persistence(format!("Failed to create scratch file: {e}")))?;
    tokio::fs::write(scratch.path(), &bytes)
        .await
        .map_err(|e| ApiError::Persistence(format!("Failed to stage upload: {e}")))?;

    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = %request_id,
        upload_bytes = bytes.len(),
        interval_seconds = interval,
        confidence,
        "Accepted video for analysis"
    );

    let report = state
        .analyzer()
        .run(scratch.path(), &request_id, interval, confidence)
        .await?;

    Ok(Json(report))
}
