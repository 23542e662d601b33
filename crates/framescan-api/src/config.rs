//! API configuration.

use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Directory annotated frames are persisted to and served from
    pub frames_dir: PathBuf,
    /// Scratch directory for uploaded videos
    pub scratch_dir: PathBuf,
    /// Path to the ONNX detection model
    pub model_path: String,
    /// Label font, falls back to system locations when unset
    pub font_path: Option<PathBuf>,
    /// Upper bound on decoded source frames per analysis (0 disables)
    pub max_frames: u64,
    /// Confidence threshold applied when the request does not set one
    pub default_confidence: f32,
    /// Sampling interval in seconds applied when the request does not set one
    pub default_interval: f64,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 200 * 1024 * 1024, // 200MB, videos are large
            frames_dir: PathBuf::from("data/frames"),
            scratch_dir: std::env::temp_dir(),
            model_path: "models/yolov8n.onnx".to_string(),
            font_path: None,
            max_frames: 108_000, // one hour at 30 fps
            default_confidence: 0.5,
            default_interval: 1.0,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("FRAMESCAN_HOST").unwrap_or(defaults.host),
            port: std::env::var("FRAMESCAN_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            frames_dir: std::env::var("FRAMESCAN_FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.frames_dir),
            scratch_dir: std::env::var("FRAMESCAN_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            model_path: std::env::var("FRAMESCAN_MODEL_PATH").unwrap_or(defaults.model_path),
            font_path: std::env::var("FRAMESCAN_FONT_PATH").ok().map(PathBuf::from),
            max_frames: std::env::var("FRAMESCAN_MAX_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_frames),
            default_confidence: std::env::var("FRAMESCAN_DEFAULT_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_confidence),
            default_interval: std::env::var("FRAMESCAN_DEFAULT_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_interval),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
