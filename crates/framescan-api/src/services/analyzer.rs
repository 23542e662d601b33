//! Video analysis aggregator.
//!
//! Drives a frame stream to exhaustion: each sampled frame is run through the
//! detector, frames with detections are annotated and persisted, and the
//! per-frame records are assembled into an [`AnalysisReport`] in source order.
//!
//! Degradation rules: a detector failure skips that frame, a persistence
//! failure keeps the record without its `image_url`. Only source-level
//! failures abort the analysis.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, warn};

use framescan_detect::Detector;
use framescan_media::{probe_video, FrameAnnotator, FrameSampler, FrameStore, FrameStream, VideoInfo};
use framescan_models::{AnalysisReport, FrameRecord, SamplingPlan};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Runs one video analysis end to end.
pub struct VideoAnalyzer {
    detector: Arc<dyn Detector>,
    annotator: Arc<FrameAnnotator>,
    store: FrameStore,
    max_frames: u64,
}

impl VideoAnalyzer {
    pub fn new(
        detector: Arc<dyn Detector>,
        annotator: Arc<FrameAnnotator>,
        store: FrameStore,
        max_frames: u64,
    ) -> Self {
        Self {
            detector,
            annotator,
            store,
            max_frames,
        }
    }

    /// Analyze a video file on disk.
    ///
    /// Probes the source, builds the sampling plan and consumes the frame
    /// stream. `request_id` namespaces the persisted frames for this request.
    pub async fn run(
        &self,
        source: &Path,
        request_id: &str,
        interval_seconds: f64,
        confidence: f32,
    ) -> ApiResult<AnalysisReport> {
        let start = Instant::now();

        let info = probe_video(source).await?;
        let plan = SamplingPlan::new(info.fps, interval_seconds)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        info!(
            request_id = %request_id,
            fps = info.fps,
            fps_assumed = info.fps_assumed,
            interval_frames = plan.interval_frames(),
            duration = info.duration,
            "Starting video analysis"
        );

        let sampler = FrameSampler::open(source, &info, plan, self.max_frames)?;
        let report = self.drive(sampler, &info, request_id, confidence).await?;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_analysis_duration(elapsed);
        info!(
            request_id = %request_id,
            frames = report.frames.len(),
            detections = report.detection_count(),
            elapsed_secs = elapsed,
            "Video analysis complete"
        );

        Ok(report)
    }

    /// Consume a frame stream into a report.
    ///
    /// Separate from [`run`](Self::run) so tests can feed synthetic streams
    /// without FFmpeg.
    pub(crate) async fn drive(
        &self,
        mut frames: impl FrameStream,
        info: &VideoInfo,
        request_id: &str,
        confidence: f32,
    ) -> ApiResult<AnalysisReport> {
        let mut report = AnalysisReport::new(info.fps, info.fps_assumed);

        while let Some((index, frame)) = frames.next_frame().await? {
            metrics::record_frame_sampled();

            let detector = Arc::clone(&self.detector);
            let image = DynamicImage::ImageRgb8(frame);
            let inference_start = Instant::now();
            let (image, result) = tokio::task::spawn_blocking(move || {
                let detections = detector.detect(&image, confidence);
                (image, detections)
            })
            .await
            .map_err(|e| ApiError::internal(format!("Detection task panicked: {e}")))?;
            metrics::record_inference_duration(
                self.detector.name(),
                inference_start.elapsed().as_secs_f64(),
            );

            let detections = match result {
                Ok(d) => d,
                Err(e) => {
                    warn!(frame = index, error = %e, "Detection failed, skipping frame");
                    continue;
                }
            };

            if detections.is_empty() {
                debug!(frame = index, "No detections, frame dropped");
                continue;
            }
            metrics::record_detections(self.detector.name(), detections.len());

            let mut annotated = image.into_rgb8();
            self.annotator.annotate_mut(&mut annotated, &detections);

            let mut record = FrameRecord::new(index, detections);
            match self.store.save(request_id, index, &annotated).await {
                Ok(relative) => {
                    metrics::record_frame_persisted();
                    record.image_url = Some(format!("/static/frames/{relative}"));
                }
                Err(e) => {
                    // Record survives without a retrieval URL.
                    warn!(frame = index, error = %e, "Failed to persist annotated frame");
                }
            }

            report
                .push(record)
                .map_err(|e| ApiError::internal(e.to_string()))?;
        }

        Ok(report)
    }
}
