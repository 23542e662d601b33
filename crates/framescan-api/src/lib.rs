//! Axum HTTP API server for object detection.
//!
//! This crate provides:
//! - `POST /predict` single-image detection
//! - `POST /analyze_video` time-sliced video analysis
//! - Static serving of persisted annotated frames
//! - Prometheus metrics and health/readiness probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::VideoAnalyzer;
pub use state::AppState;
