//! Single-image detection handler.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tracing::info;

use framescan_models::Detection;

use crate::error::{ApiError, ApiResult};
use crate::handlers::parse_confidence;
use crate::metrics;
use crate::state::AppState;

/// Response for `POST /predict`.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// Annotated image as base64-encoded JPEG
    pub image: String,
    /// Unique detected class labels in first-seen order
    pub classes: Vec<String>,
    /// Full detections in detector output order
    pub detections: Vec<Detection>,
}

/// Detect objects in a single uploaded image.
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let mut file: Option<Bytes> = None;
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
    let confidence = confidence.unwrap_or(state.config.default_confidence);

    let image = image::load_from_memory(&bytes)
        .map_err(|e| ApiError::DecodeFailure(e.to_string()))?;

    let detector = Arc::clone(&state.detector);
    let inference_start = Instant::now();
    let (image, result) = tokio::task::spawn_blocking(move || {
        let detections = detector.detect(&image, confidence);
        (image, detections)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Detection task panicked: {e}")))?;
    metrics::record_inference_duration(
        state.detector.name(),
        inference_start.elapsed().as_secs_f64(),
    );

    let detections = result?;
    metrics::record_detections(state.detector.name(), detections.len());

    let mut annotated = image.into_rgb8();
    state.annotator.annotate_mut(&mut annotated, &detections);

    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(annotated)
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
        .map_err(|e| ApiError::internal(format!("Failed to encode annotated image: {e}")))?;

    let classes = unique_classes(&detections);
    info!(
        detections = detections.len(),
        classes = ?classes,
        confidence,
        "Image prediction complete"
    );

    Ok(Json(PredictResponse {
        image: BASE64.encode(&encoded),
        classes,
        detections,
    }))
}

/// Unique class labels in first-seen order.
fn unique_classes(detections: &[Detection]) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    for detection in detections {
        if !classes.iter().any(|c| c == &detection.label) {
            classes.push(detection.label.clone());
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use framescan_models::BoundingBox;

    fn det(label: &str) -> Detection {
        Detection::new(label, 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_unique_classes_first_seen_order() {
        let detections = vec![det("dog"), det("person"), det("dog"), det("car")];
        assert_eq!(unique_classes(&detections), vec!["dog", "person", "car"]);
    }

    #[test]
    fn test_unique_classes_empty() {
        assert!(unique_classes(&[]).is_empty());
    }
}
