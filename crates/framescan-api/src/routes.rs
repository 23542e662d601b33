//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{analyze_video, health, predict, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config.cors_origins);
    let frames = ServeDir::new(state.frame_store.root());

    let mut router = Router::new()
        .route("/predict", post(predict))
        .route("/analyze_video", post(analyze_video))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .nest_service("/static/frames", frames)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .with_state(state);

    if let Some(handle) = metrics_handle {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use framescan_detect::{DetectResult, Detector};
    use framescan_media::{FrameAnnotator, FrameStore};
    use framescan_models::{BoundingBox, Detection};

    use crate::config::ApiConfig;

    const BOUNDARY: &str = "----framescan-test-boundary";

    struct FakeDetector {
        detections: Vec<Detection>,
    }

    impl Detector for FakeDetector {
        fn detect(
            &self,
            _image: &DynamicImage,
            confidence_threshold: f32,
        ) -> DetectResult<Vec<Detection>> {
            Ok(self
                .detections
                .iter()
                .filter(|d| d.confidence >= confidence_threshold)
                .cloned()
                .collect())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn test_router(detections: Vec<Detection>) -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = ApiConfig {
            frames_dir: dir.path().join("frames"),
            scratch_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let state = AppState::with_components(
            config,
            Arc::new(FakeDetector { detections }),
            Arc::new(FrameAnnotator::with_font(None)),
            FrameStore::new(dir.path().join("frames")),
        );
        (create_router(state, None), dir)
    }

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(5.0, 5.0, 20.0, 20.0))
    }

    fn png_bytes() -> Vec<u8> {
        let image = RgbImage::from_pixel(32, 32, Rgb([80, 120, 160]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            if *name == "file" {
                body.extend_from_slice(
                    b"Content-Disposition: form-data; name=\"file\"; filename=\"upload.bin\"\r\n\
                      Content-Type: application/octet-stream\r\n\r\n",
                );
            } else {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _dir) = test_router(vec![]);
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_request_id_header_is_set_and_echoed() {
        let (router, _dir) = test_router(vec![]);
        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("X-Request-ID"));

        let response = router
            .oneshot(
                Request::get("/health")
                    .header("X-Request-ID", "caller-supplied-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("X-Request-ID").unwrap(),
            "caller-supplied-id"
        );
    }

    #[tokio::test]
    async fn test_predict_returns_annotated_image_and_classes() {
        let (router, _dir) = test_router(vec![detection("person", 0.9), detection("dog", 0.8)]);

        let body = multipart_body(&[("file", &png_bytes())]);
        let response = router
            .oneshot(multipart_request("/predict", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["classes"], serde_json::json!(["person", "dog"]));
        assert_eq!(json["detections"].as_array().unwrap().len(), 2);
        assert_eq!(json["detections"][0]["label"], "person");

        // Returned image is a decodable base64 JPEG
        let encoded = json["image"].as_str().unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        let annotated = image::load_from_memory(&decoded).unwrap();
        assert_eq!(annotated.width(), 32);
    }

    #[tokio::test]
    async fn test_predict_applies_confidence_threshold() {
        let (router, _dir) = test_router(vec![detection("person", 0.9), detection("dog", 0.3)]);

        let body = multipart_body(&[("file", &png_bytes()), ("confidence", b"0.5")]);
        let response = router
            .oneshot(multipart_request("/predict", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["classes"], serde_json::json!(["person"]));
    }

    #[tokio::test]
    async fn test_predict_missing_file_is_bad_request() {
        let (router, _dir) = test_router(vec![]);

        let body = multipart_body(&[("confidence", b"0.5")]);
        let response = router
            .oneshot(multipart_request("/predict", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert!(json["detail"].as_str().unwrap().contains("file"));
    }

    #[tokio::test]
    async fn test_predict_undecodable_image_is_bad_request() {
        let (router, _dir) = test_router(vec![]);

        let body = multipart_body(&[("file", b"definitely not an image")]);
        let response = router
            .oneshot(multipart_request("/predict", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_predict_invalid_confidence_is_bad_request() {
        let (router, _dir) = test_router(vec![]);

        let body = multipart_body(&[("file", &png_bytes()), ("confidence", b"2.0")]);
        let response = router
            .oneshot(multipart_request("/predict", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_video_invalid_interval_is_bad_request() {
        let (router, _dir) = test_router(vec![]);

        let body = multipart_body(&[("file", b"fake video"), ("interval_seconds", b"0")]);
        let response = router
            .oneshot(multipart_request("/analyze_video", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_video_unreadable_source_is_bad_request() {
        // Needs ffprobe to exercise the probe failure path.
        if which::which("ffprobe").is_err() {
            return;
        }
        let (router, dir) = test_router(vec![]);

        let body = multipart_body(&[("file", b"not a video at all")]);
        let response = router
            .oneshot(multipart_request("/analyze_video", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Scratch upload is removed even on the failure path
        let leaked: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("framescan-upload-")
            })
            .collect();
        assert!(leaked.is_empty(), "scratch files left behind: {leaked:?}");
    }

    #[tokio::test]
    async fn test_static_frames_serves_persisted_frame() {
        let (router, dir) = test_router(vec![]);

        let store = FrameStore::new(dir.path().join("frames"));
        store
            .save("req-1", 30, &RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])))
            .await
            .unwrap();

        let response = router
            .oneshot(
                Request::get("/static/frames/req-1/frame_30.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_frames_unknown_is_not_found() {
        let (router, _dir) = test_router(vec![]);

        let response = router
            .oneshot(
                Request::get("/static/frames/missing/frame_0.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
