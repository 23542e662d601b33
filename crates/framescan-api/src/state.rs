//! Application state.

use std::sync::Arc;

use tracing::info;

use framescan_detect::{Detector, ObjectDetector, ObjectDetectorConfig};
use framescan_media::{FrameAnnotator, FrameStore};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::services::VideoAnalyzer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub detector: Arc<dyn Detector>,
    pub annotator: Arc<FrameAnnotator>,
    pub frame_store: FrameStore,
}

impl AppState {
    /// Create application state, loading the detection model.
    ///
    /// Called once at startup; a missing model or unwritable frames directory
    /// is fatal here rather than a per-request failure.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        std::fs::create_dir_all(&config.frames_dir).map_err(|e| {
            ApiError::internal(format!(
                "Cannot create frames directory {}: {e}",
                config.frames_dir.display()
            ))
        })?;
        std::fs::create_dir_all(&config.scratch_dir).map_err(|e| {
            ApiError::internal(format!(
                "Cannot create scratch directory {}: {e}",
                config.scratch_dir.display()
            ))
        })?;

        let detector = ObjectDetector::new(ObjectDetectorConfig {
            model_path: config.model_path.clone(),
            ..Default::default()
        })?;

        let annotator = FrameAnnotator::from_config(config.font_path.as_deref());
        let frame_store = FrameStore::new(&config.frames_dir);

        info!(
            frames_dir = %config.frames_dir.display(),
            model_path = %config.model_path,
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            detector: Arc::new(detector),
            annotator: Arc::new(annotator),
            frame_store,
        })
    }

    /// Assemble state from already-built components. Used by tests to swap in
    /// a stub detector without a model file on disk.
    pub fn with_components(
        config: ApiConfig,
        detector: Arc<dyn Detector>,
        annotator: Arc<FrameAnnotator>,
        frame_store: FrameStore,
    ) -> Self {
        Self {
            config: Arc::new(config),
            detector,
            annotator,
            frame_store,
        }
    }

    /// Video analyzer over this state's components.
    pub fn analyzer(&self) -> VideoAnalyzer {
        VideoAnalyzer::new(
            Arc::clone(&self.detector),
            Arc::clone(&self.annotator),
            self.frame_store.clone(),
            self.config.max_frames,
        )
    }
}
