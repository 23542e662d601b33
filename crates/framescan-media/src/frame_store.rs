//! On-disk persistence for annotated frames.
//!
//! Frames are written as JPEG under `{root}/{request_id}/frame_{index}.jpg`.
//! The request id namespaces concurrent analyses so they never collide.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::MediaResult;

/// Stores annotated frames on local disk.
#[derive(Debug, Clone)]
pub struct FrameStore {
    root: PathBuf,
}

impl FrameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory frames are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist one annotated frame.
    ///
    /// Returns the path relative to the store root, suitable for building the
    /// retrieval URL. The parent directory is created on first use.
    pub async fn save(
        &self,
        request_id: &str,
        frame_index: u64,
        image: &RgbImage,
    ) -> MediaResult<String> {
        let relative = format!("{request_id}/frame_{frame_index}.jpg");
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)?;

        fs::write(&path, encoded).await?;
        debug!(path = %path.display(), "Persisted annotated frame");

        Ok(relative)
    }
}
