use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::Detection;

/// Errors assembling an analysis report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Frame {new} does not come after frame {last}: records must be strictly increasing")]
    NonMonotonicFrame { last: u64, new: u64 },

    #[error("Frame {0} has no detections: empty frames are never recorded")]
    EmptyFrame(u64),
}

/// Detections found in one sampled video frame.
///
/// Created only for sampled frames with at least one detection. `image_url`
/// points at the persisted annotated frame and is set only when persistence
/// succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameRecord {
    /// Index of the frame in the source video (0-based)
    #[serde(rename = "frame")]
    pub frame_index: u64,
    /// Detections in detector output order
    pub detections: Vec<Detection>,
    /// Retrieval path for the persisted annotated frame, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl FrameRecord {
    pub fn new(frame_index: u64, detections: Vec<Detection>) -> Self {
        Self {
            frame_index,
            detections,
            image_url: None,
        }
    }
}

/// Ordered per-frame analysis of one video upload.
///
/// Built incrementally by the aggregator during a single request and immutable
/// once returned. Frame records are strictly increasing in `frame_index`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    /// Frame records in ascending frame order
    #[serde(rename = "video_analysis")]
    pub frames: Vec<FrameRecord>,
    /// Source frame rate used for the sampling plan
    #[serde(rename = "fps")]
    pub source_fps: f64,
    /// True when the source did not report a usable frame rate and the
    /// 30 fps default was applied
    pub fps_assumed: bool,
}

impl AnalysisReport {
    pub fn new(source_fps: f64, fps_assumed: bool) -> Self {
        Self {
            frames: Vec::new(),
            source_fps,
            fps_assumed,
        }
    }

    /// Append a frame record, enforcing the report invariants: strictly
    /// ascending frame indices and no empty frames.
    pub fn push(&mut self, record: FrameRecord) -> Result<(), ReportError> {
        if record.detections.is_empty() {
            return Err(ReportError::EmptyFrame(record.frame_index));
        }
        if let Some(last) = self.frames.last() {
            if record.frame_index <= last.frame_index {
                return Err(ReportError::NonMonotonicFrame {
                    last: last.frame_index,
                    new: record.frame_index,
                });
            }
        }
        self.frames.push(record);
        Ok(())
    }

    /// Total detections across all recorded frames.
    pub fn detection_count(&self) -> usize {
        self.frames.iter().map(|f| f.detections.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BoundingBox;

    fn det() -> Detection {
        Detection::new("person", 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_push_keeps_ascending_order() {
        let mut report = AnalysisReport::new(30.0, false);
        report.push(FrameRecord::new(0, vec![det()])).unwrap();
        report.push(FrameRecord::new(30, vec![det()])).unwrap();
        report.push(FrameRecord::new(60, vec![det()])).unwrap();

        let indices: Vec<u64> = report.frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![0, 30, 60]);
        assert_eq!(report.detection_count(), 3);
    }

    #[test]
    fn test_push_rejects_out_of_order_frame() {
        let mut report = AnalysisReport::new(30.0, false);
        report.push(FrameRecord::new(30, vec![det()])).unwrap();
        let err = report.push(FrameRecord::new(30, vec![det()])).unwrap_err();
        assert!(matches!(err, ReportError::NonMonotonicFrame { .. }));
        assert!(report.push(FrameRecord::new(0, vec![det()])).is_err());
    }

    #[test]
    fn test_push_rejects_empty_frame() {
        let mut report = AnalysisReport::new(30.0, false);
        let err = report.push(FrameRecord::new(0, vec![])).unwrap_err();
        assert!(matches!(err, ReportError::EmptyFrame(0)));
        assert!(report.frames.is_empty());
    }

    #[test]
    fn test_report_wire_format() {
        let mut report = AnalysisReport::new(29.97, false);
        report.push(FrameRecord::new(0, vec![det()])).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["video_analysis"].is_array());
        assert_eq!(json["video_analysis"][0]["frame"], 0);
        assert_eq!(json["fps"], 29.97);
        assert_eq!(json["fps_assumed"], false);
    }

    #[test]
    fn test_image_url_omitted_when_unset() {
        let record = FrameRecord::new(30, vec![det()]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["frame"], 30);
        assert!(json.get("image_url").is_none());

        let mut with_url = FrameRecord::new(30, vec![det()]);
        with_url.image_url = Some("/static/frames/abc/frame_30.jpg".to_string());
        let json = serde_json::to_value(&with_url).unwrap();
        assert_eq!(json["image_url"], "/static/frames/abc/frame_30.jpg");
    }
}
