//! Health and readiness handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "framescan-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe.
///
/// Ready means the external tools the analysis path shells out to are
/// actually present. The model is checked at startup and cannot go away.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ffmpeg = which::which("ffmpeg").is_ok();
    let ffprobe = which::which("ffprobe").is_ok();
    let ready = ffmpeg && ffprobe;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "ready": ready,
            "ffmpeg": ffmpeg,
            "ffprobe": ffprobe,
            "detector": state.detector.name(),
        })),
    )
}
