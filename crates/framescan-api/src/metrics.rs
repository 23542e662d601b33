//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "framescan_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "framescan_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "framescan_http_requests_in_flight";

    // Detection metrics
    pub const DETECTIONS_TOTAL: &str = "framescan_detections_total";
    pub const INFERENCE_DURATION_SECONDS: &str = "framescan_inference_duration_seconds";

    // Video analysis metrics
    pub const FRAMES_SAMPLED_TOTAL: &str = "framescan_frames_sampled_total";
    pub const FRAMES_PERSISTED_TOTAL: &str = "framescan_frames_persisted_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "framescan_analysis_duration_seconds";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record detections produced for one frame or image.
pub fn record_detections(detector: &str, count: usize) {
    let labels = [("detector", detector.to_string())];
    counter!(names::DETECTIONS_TOTAL, &labels).increment(count as u64);
}

/// Record model inference duration.
pub fn record_inference_duration(detector: &str, duration_secs: f64) {
    let labels = [("detector", detector.to_string())];
    histogram!(names::INFERENCE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a frame pulled off the sampler.
pub fn record_frame_sampled() {
    counter!(names::FRAMES_SAMPLED_TOTAL).increment(1);
}

/// Record an annotated frame written to disk.
pub fn record_frame_persisted() {
    counter!(names::FRAMES_PERSISTED_TOTAL).increment(1);
}

/// Record end-to-end duration of one video analysis.
pub fn record_analysis_duration(duration_secs: f64) {
    histogram!(names::ANALYSIS_DURATION_SECONDS).record(duration_secs);
}

/// Sanitize path for metrics labels.
///
/// Frame retrieval paths embed a per-request UUID and frame index; collapse
/// them so the label set stays bounded.
fn sanitize_path(path: &str) -> String {
    match path.strip_prefix("/static/frames/") {
        Some(rest) if !rest.is_empty() => "/static/frames/:frame".to_string(),
        _ => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
