//! Seams to the video decoder.

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// An encoded still image (JPEG) as produced by the decoder.
pub type Frame = Vec<u8>;

/// Container-level facts about an opened video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    #[serde(serialize_with = "round2")]
    pub fps: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    /// Seconds, derived as `frame_count / fps`.
    #[serde(serialize_with = "round2")]
    pub duration: f64,
    pub duration_formatted: String,
    pub codec: String,
}

impl VideoInfo {
    pub fn new(fps: f64, frame_count: u64, width: u32, height: u32, codec: impl Into<String>) -> Self {
        let duration = if fps > 0.0 { frame_count as f64 / fps } else { 0.0 };
        Self {
            fps,
            frame_count,
            width,
            height,
            duration,
            duration_formatted: format_duration(duration),
            codec: codec.into(),
        }
    }
}

fn round2<S: Serializer>(v: &f64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64((v * 100.0).round() / 100.0)
}

/// `MM:SS`, or `HH:MM:SS` from one hour up.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// A seekable, opened video. Dropping it releases the decoder and any temp files.
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    /// Decode the frame at a zero-based index.
    fn frame_at_index(&mut self, index: u64) -> Result<Frame>;

    /// Decode the frame shown at `seconds` into the video.
    fn frame_at_time(&mut self, seconds: f64) -> Result<Frame> {
        let fps = self.info().fps;
        if !(fps > 0.0) {
            return Err(Error::media("video has no frame rate"));
        }
        if !(seconds >= 0.0) {
            return Err(Error::media(format!("cannot seek to {seconds}s")));
        }
        self.frame_at_index((seconds * fps).floor() as u64)
    }
}

/// Opens uploaded video bytes. `max_width` downscales decoded frames.
pub trait VideoOpener: Send + Sync {
    fn open(&self, bytes: &[u8], max_width: Option<u32>) -> Result<Box<dyn FrameSource + Send>>;
}
