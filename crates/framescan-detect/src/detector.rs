//! Object detection using a YOLOv8 ONNX model.
//!
//! Uses ONNX Runtime for inference with automatic execution provider selection:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS with Apple Silicon
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use framescan_models::{BoundingBox, Detection};

use crate::error::{DetectError, DetectResult};
use crate::labels::class_label;

/// Detection capability shared by all requests.
///
/// Implementations must be side-effect free: calling `detect` twice on the
/// same frame with the same threshold yields identical results, and raising
/// the threshold never adds detections.
pub trait Detector: Send + Sync {
    /// Detect objects in an image.
    ///
    /// Detections below `confidence_threshold` are filtered by the capability
    /// itself; an empty result is not an error.
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> DetectResult<Vec<Detection>>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

/// Configuration for the YOLOv8 detector.
#[derive(Debug, Clone)]
pub struct ObjectDetectorConfig {
    /// Path to the ONNX model file
    pub model_path: String,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for ObjectDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// YOLOv8 object detector backed by ONNX Runtime.
///
/// The session is not assumed reentrant, so it sits behind a mutex; concurrent
/// requests serialize on inference only.
pub struct ObjectDetector {
    session: Mutex<Session>,
    config: ObjectDetectorConfig,
}

impl ObjectDetector {
    /// Load the model and create a detector.
    ///
    /// Returns an error if the model file doesn't exist or cannot be loaded.
    /// Call once at startup; a failure here is fatal for the service.
    pub fn new(config: ObjectDetectorConfig) -> DetectResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(DetectError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Object detector initialized"
        );

        Ok(Self { session, config })
    }

    /// Preprocess image for YOLOv8 inference.
    ///
    /// - Resize to model input size
    /// - Normalize pixel values to [0, 1]
    /// - Convert to NCHW format (batch, channels, height, width)
    fn preprocess(&self, img: &DynamicImage) -> DetectResult<Value> {
        let input_size = self.config.input_size;

        let resized = img.resize_exact(
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);

        // HWC -> CHW with normalization to [0, 1]
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| DetectError::internal(format!("Failed to create tensor: {e}")))
    }

    /// Run ONNX inference and extract the raw output tensor.
    fn run_inference(&self, input: Value) -> DetectResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectError::inference(format!("ONNX inference failed: {e}")))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| DetectError::InvalidOutput("Missing output0 tensor".to_string()))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::InvalidOutput(format!("Failed to extract tensor: {e}")))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Get the configuration.
    pub fn config(&self) -> &ObjectDetectorConfig {
        &self.config
    }
}

impl Detector for ObjectDetector {
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> DetectResult<Vec<Detection>> {
        let (width, height) = (image.width(), image.height());

        let input = self.preprocess(image)?;
        let outputs = self.run_inference(input)?;
        let detections =
            decode_output(&self.config, &outputs, width, height, confidence_threshold)?;

        debug!(count = detections.len(), "Object detection completed");
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "yolov8-onnx"
    }
}

/// Decode YOLOv8 output into pixel-space detections.
///
/// Output layout is `[1, 84, N]`: 4 bbox values (cx, cy, w, h) in model
/// coordinates plus 80 class scores, for N candidate boxes. The confidence
/// threshold is applied here, inside the capability.
fn decode_output(
    config: &ObjectDetectorConfig,
    outputs: &[f32],
    orig_width: u32,
    orig_height: u32,
    confidence_threshold: f32,
) -> DetectResult<Vec<Detection>> {
    const NUM_CLASSES: usize = 80;
    const NUM_FEATURES: usize = 4 + NUM_CLASSES;

    if outputs.is_empty() || outputs.len() % NUM_FEATURES != 0 {
        return Err(DetectError::InvalidOutput(format!(
            "Output length {} is not a multiple of {}",
            outputs.len(),
            NUM_FEATURES
        )));
    }
    let num_boxes = outputs.len() / NUM_FEATURES;

    // Output is [84, N]; transpose to iterate candidates row-wise.
    let output_array = Array::from_shape_vec((NUM_FEATURES, num_boxes), outputs.to_vec())
        .map_err(|e| DetectError::InvalidOutput(format!("Failed to reshape output: {e}")))?;
    let transposed = output_array.t();

    let input_size = config.input_size as f32;
    let scale_w = orig_width as f32 / input_size;
    let scale_h = orig_height as f32 / input_size;

    let mut candidates: Vec<(usize, f32, BoundingBox)> = Vec::new();

    for i in 0..num_boxes {
        let cx = transposed[[i, 0]];
        let cy = transposed[[i, 1]];
        let w = transposed[[i, 2]];
        let h = transposed[[i, 3]];

        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..NUM_CLASSES {
            let score = transposed[[i, 4 + c]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < confidence_threshold {
            continue;
        }

        // Center format -> corner format, scaled to source pixels.
        let bbox = BoundingBox::from_xywh(
            (cx - w / 2.0) * scale_w,
            (cy - h / 2.0) * scale_h,
            w * scale_w,
            h * scale_h,
        )
        .clamp(orig_width, orig_height);

        if !bbox.is_valid() {
            continue;
        }

        candidates.push((best_class, best_score, bbox));
    }

    let kept = non_maximum_suppression(candidates, config.nms_threshold);

    Ok(kept
        .into_iter()
        .map(|(class_id, confidence, bbox)| Detection::new(class_label(class_id), confidence, bbox))
        .collect())
}

/// Greedy per-class NMS: sort by confidence descending, suppress overlapping
/// boxes of the same class.
fn non_maximum_suppression(
    mut detections: Vec<(usize, f32, BoundingBox)>,
    iou_threshold: f32,
) -> Vec<(usize, f32, BoundingBox)> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i]);

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].0 != detections[j].0 {
                continue;
            }
            if detections[i].2.iou(&detections[j].2) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> DetectResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| DetectError::session_init(format!("Failed to read model file: {e}")))?;

    let mut builder = Session::builder()
        .map_err(|e| DetectError::session_init(format!("Failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DetectError::session_init(format!("Failed to set optimization level: {e}")))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for object detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| DetectError::session_init(format!("Failed to load ONNX model: {e}")))
}
