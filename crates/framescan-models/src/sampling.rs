use thiserror::Error;

/// Errors constructing a sampling plan.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Sampling interval must be positive, got {0}")]
    NonPositiveInterval(f64),

    #[error("Source fps must be positive, got {0}")]
    NonPositiveFps(f64),
}

/// Derived frame-sampling cadence for one analysis.
///
/// A frame is analyzed when `frame_index % interval_frames == 0`, where
/// `interval_frames = max(1, round(source_fps * interval_seconds))`. The plan
/// is derived per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPlan {
    interval_frames: u64,
}

impl SamplingPlan {
    /// Build a plan from the source frame rate and the requested interval.
    pub fn new(source_fps: f64, interval_seconds: f64) -> Result<Self, SamplingError> {
        if !(interval_seconds > 0.0) {
            return Err(SamplingError::NonPositiveInterval(interval_seconds));
        }
        if !(source_fps > 0.0) {
            return Err(SamplingError::NonPositiveFps(source_fps));
        }

        let interval_frames = (source_fps * interval_seconds).round() as u64;
        Ok(Self {
            interval_frames: interval_frames.max(1),
        })
    }

    /// Number of source frames between samples.
    pub fn interval_frames(&self) -> u64 {
        self.interval_frames
    }

    /// Whether the given source frame index is on the sampling cadence.
    pub fn is_sampled(&self, frame_index: u64) -> bool {
        frame_index % self.interval_frames == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_second_at_30fps() {
        let plan = SamplingPlan::new(30.0, 1.0).unwrap();
        assert_eq!(plan.interval_frames(), 30);
        let sampled: Vec<u64> = (0..300).filter(|i| plan.is_sampled(*i)).collect();
        assert_eq!(sampled, vec![0, 30, 60, 90, 120, 150, 180, 210, 240, 270]);
    }

    #[test]
    fn test_sub_frame_interval_clamps_to_every_frame() {
        // 0.01s at 30fps rounds to 0 frames; clamped to 1
        let plan = SamplingPlan::new(30.0, 0.01).unwrap();
        assert_eq!(plan.interval_frames(), 1);
        assert!(plan.is_sampled(7));
    }

    #[test]
    fn test_fractional_fps_rounds() {
        let plan = SamplingPlan::new(29.97, 1.0).unwrap();
        assert_eq!(plan.interval_frames(), 30);
        let plan = SamplingPlan::new(23.976, 0.5).unwrap();
        assert_eq!(plan.interval_frames(), 12);
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        assert!(SamplingPlan::new(30.0, 0.0).is_err());
        assert!(SamplingPlan::new(30.0, -1.0).is_err());
        assert!(SamplingPlan::new(30.0, f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_non_positive_fps() {
        assert!(SamplingPlan::new(0.0, 1.0).is_err());
        assert!(SamplingPlan::new(-30.0, 1.0).is_err());
    }

    #[test]
    fn test_frame_zero_always_sampled() {
        for (fps, interval) in [(30.0, 1.0), (60.0, 2.5), (24.0, 0.2)] {
            let plan = SamplingPlan::new(fps, interval).unwrap();
            assert!(plan.is_sampled(0));
        }
    }
}
