//! Sequential frame sampling over an FFmpeg rawvideo pipe.
//!
//! The sampler decodes every frame of the source in order (no seeking) and
//! yields only those on the sampling cadence. Total work is O(video length)
//! regardless of the interval: discarded frames are still decoded and read
//! off the pipe. The stream is finite and not restartable; the FFmpeg child
//! is consumed along with it.

use async_trait::async_trait;
use image::RgbImage;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use framescan_models::SamplingPlan;

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// A finite, ordered stream of sampled video frames.
///
/// Seam for the analysis aggregator; the production implementation is
/// [`FrameSampler`].
#[async_trait]
pub trait FrameStream: Send {
    /// Next sampled frame, or `None` when the source is exhausted.
    /// Frame indices are strictly increasing across calls.
    async fn next_frame(&mut self) -> MediaResult<Option<(u64, RgbImage)>>;
}

/// Frame sampler reading rgb24 frames from an FFmpeg child process.
pub struct FrameSampler {
    child: Child,
    stdout: BufReader<ChildStdout>,
    frame_buf: Vec<u8>,
    width: u32,
    height: u32,
    plan: SamplingPlan,
    next_index: u64,
    max_frames: u64,
    exhausted: bool,
}

impl FrameSampler {
    /// Spawn the decoder and position it at the first frame.
    ///
    /// `max_frames` bounds how many source frames are decoded in total
    /// (0 disables the guard). Fails with `SourceUnreadable` if the decoder
    /// cannot be started.
    pub fn open(
        path: impl AsRef<std::path::Path>,
        info: &VideoInfo,
        plan: SamplingPlan,
        max_frames: u64,
    ) -> MediaResult<Self> {
        let path = path.as_ref();

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-pix_fmt", "rgb24", "-f", "rawvideo", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            MediaError::source_unreadable(format!("Failed to spawn FFmpeg: {e}"))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("Failed to capture FFmpeg stdout"))?;

        let bytes_per_frame = bytes_per_frame(info.width, info.height);
        debug!(
            width = info.width,
            height = info.height,
            interval_frames = plan.interval_frames(),
            "Frame sampler opened"
        );

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            frame_buf: vec![0u8; bytes_per_frame],
            width: info.width,
            height: info.height,
            plan,
            next_index: 0,
            max_frames,
            exhausted: false,
        })
    }

    /// Read exactly one decoded frame off the pipe.
    ///
    /// Returns `false` on clean end-of-stream. A partial trailing frame is
    /// treated as end-of-stream as well; FFmpeg emits whole frames, so a
    /// truncated read only happens when the source itself is truncated.
    async fn read_raw_frame(&mut self) -> MediaResult<bool> {
        match self.stdout.read_exact(&mut self.frame_buf).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(MediaError::Io(e)),
        }
    }

    async fn finish(&mut self) {
        self.exhausted = true;
        // Reap the child; on the cap path it may still be running.
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

#[async_trait]
impl FrameStream for FrameSampler {
    async fn next_frame(&mut self) -> MediaResult<Option<(u64, RgbImage)>> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            if self.max_frames > 0 && self.next_index >= self.max_frames {
                warn!(
                    max_frames = self.max_frames,
                    "Frame cap reached, truncating analysis"
                );
                self.finish().await;
                return Ok(None);
            }

            if !self.read_raw_frame().await? {
                self.finish().await;
                return Ok(None);
            }

            let index = self.next_index;
            self.next_index += 1;

            if !self.plan.is_sampled(index) {
                continue;
            }

            let image = RgbImage::from_raw(self.width, self.height, self.frame_buf.clone())
                .ok_or_else(|| MediaError::internal("Frame buffer size mismatch"))?;
            return Ok(Some((index, image)));
        }
    }
}

/// Size of one rgb24 frame on the pipe.
fn bytes_per_frame(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_frame() {
        assert_eq!(bytes_per_frame(160, 90), 160 * 90 * 3);
        assert_eq!(bytes_per_frame(1920, 1080), 6_220_800);
    }

    #[tokio::test]
    async fn test_open_missing_file_terminates_cleanly() {
        // ffmpeg spawn succeeds even for missing inputs; the failure shows up
        // as immediate EOF. Opening against a path that cannot exist must not
        // panic and the stream must terminate.
        if which::which("ffmpeg").is_err() {
            return;
        }
        let info = VideoInfo {
            duration: 0.0,
            width: 16,
            height: 16,
            fps: 30.0,
            fps_assumed: false,
            codec: String::new(),
        };
        let plan = SamplingPlan::new(30.0, 1.0).unwrap();
        let mut sampler = FrameSampler::open("/nonexistent/clip.mp4", &info, plan, 0).unwrap();
        let frame = sampler.next_frame().await.unwrap();
        assert!(frame.is_none());
        // Stream stays exhausted
        assert!(sampler.next_frame().await.unwrap().is_none());
    }
}
