//! FFprobe video information.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::warn;

use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the source does not report a usable one.
/// This is a policy default, not a measurement, and is surfaced to callers
/// through [`VideoInfo::fps_assumed`].
pub const DEFAULT_FPS: f64 = 30.0;

/// Video file information.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps), always positive
    pub fps: f64,
    /// True when `fps` is the [`DEFAULT_FPS`] fallback rather than a value
    /// reported by the source
    pub fps_assumed: bool,
    /// Video codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a video file for information.
///
/// Fails with `SourceUnreadable` if ffprobe cannot parse the file or it has
/// no video stream.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::source_unreadable(format!(
            "File not found: {}",
            path.display()
        )));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::source_unreadable_with_stderr(
            "FFprobe failed to read the source",
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::source_unreadable(format!("Unparseable ffprobe output: {e}")))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::source_unreadable("No video stream found"))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let reported_fps = reported_frame_rate(
        video_stream.avg_frame_rate.as_deref(),
        video_stream.r_frame_rate.as_deref(),
    );
    let (fps, fps_assumed) = resolve_fps(reported_fps);
    if fps_assumed {
        warn!(
            path = %path.display(),
            assumed_fps = DEFAULT_FPS,
            "Source reported no usable frame rate, applying default"
        );
    }

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::source_unreadable(
            "Video stream has no dimensions",
        ));
    }

    Ok(VideoInfo {
        duration,
        width,
        height,
        fps,
        fps_assumed,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Pick the reported frame rate from the two ffprobe fields. Each is parsed
/// independently: ffprobe commonly reports `avg_frame_rate: "0/0"` alongside a
/// valid `r_frame_rate`, and an unusable average must not shadow it.
fn reported_frame_rate(avg: Option<&str>, r: Option<&str>) -> Option<f64> {
    avg.and_then(parse_frame_rate)
        .filter(|fps| *fps > 0.0)
        .or_else(|| r.and_then(parse_frame_rate))
}

/// Apply the frame-rate fallback policy: non-positive or missing rates become
/// [`DEFAULT_FPS`], flagged as assumed.
fn resolve_fps(reported: Option<f64>) -> (f64, bool) {
    match reported {
        Some(fps) if fps > 0.0 && fps.is_finite() => (fps, false),
        _ => (DEFAULT_FPS, true),
    }
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}
