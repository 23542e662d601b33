//! Video and image plumbing for the Framescan backend.
//!
//! This crate provides:
//! - FFprobe-based source probing with an explicit frame-rate fallback
//! - A sequential, non-restartable frame sampler over an FFmpeg rawvideo pipe
//! - Bounding-box and label annotation onto frames
//! - On-disk persistence of annotated frames, namespaced per request

pub mod annotate;
pub mod error;
pub mod frame_store;
pub mod probe;
pub mod sampler;

pub use annotate::FrameAnnotator;
pub use error::{MediaError, MediaResult};
pub use frame_store::FrameStore;
pub use probe::{probe_video, VideoInfo};
pub use sampler::{FrameSampler, FrameStream};
