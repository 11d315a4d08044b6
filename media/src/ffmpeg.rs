//! Video access through the `ffprobe` and `ffmpeg` binaries.
//!
//! Uploaded bytes are spooled to a temp file that lives as long as the
//! opened [`FfmpegVideo`]; every frame request runs one short `ffmpeg`
//! process that seeks and pipes a single JPEG back.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use track::{Error, Frame, FrameSource, Result, VideoInfo, VideoOpener};

/// Opens videos with the configured codec binaries.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_name,width,height,avg_frame_rate,r_frame_rate,nb_frames,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status, stderr = %stderr.trim(), "ffprobe rejected upload");
            return Err(Error::media("could not read video file"));
        }
        parse_probe(&String::from_utf8_lossy(&output.stdout))
    }
}

impl VideoOpener for Ffmpeg {
    fn open(&self, bytes: &[u8], max_width: Option<u32>) -> Result<Box<dyn FrameSource + Send>> {
        let mut file = tempfile::Builder::new()
            .prefix("geotag-")
            .suffix(".video")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let info = self.probe(file.path())?;
        debug!(
            path = %file.path().display(),
            fps = info.fps,
            frames = info.frame_count,
            codec = %info.codec,
            "opened video"
        );
        Ok(Box::new(FfmpegVideo {
            file,
            info,
            ffmpeg: self.ffmpeg.clone(),
            max_width,
        }))
    }
}

/// An uploaded video spooled to disk. Dropping it deletes the temp file.
pub struct FfmpegVideo {
    file: NamedTempFile,
    info: VideoInfo,
    ffmpeg: PathBuf,
    max_width: Option<u32>,
}

impl FrameSource for FfmpegVideo {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_at_index(&mut self, index: u64) -> Result<Frame> {
        if index >= self.info.frame_count {
            return Err(Error::media(format!(
                "frame {index} is past the end of a {}-frame video",
                self.info.frame_count
            )));
        }
        let seconds = index as f64 / self.info.fps;

        let seek = format!("{seconds:.6}");
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-ss", seek.as_str(), "-i"])
            .arg(self.file.path())
            .args(["-frames:v", "1"]);
        if let Some(width) = self.max_width {
            cmd.arg("-vf").arg(format!("scale='min({width},iw)':-2"));
        }
        cmd.args(["-f", "image2pipe", "-vcodec", "mjpeg", "-q:v", "2", "pipe:1"])
            .stdin(Stdio::null());

        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::media(format!(
                "ffmpeg failed at frame {index}: {}",
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(Error::media(format!("no image decoded at frame {index}")));
        }
        debug!(index, bytes = output.stdout.len(), "decoded frame");
        Ok(output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct Probe {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Turn `ffprobe -of json` output into [`VideoInfo`].
pub fn parse_probe(json: &str) -> Result<VideoInfo> {
    let probe: Probe = serde_json::from_str(json)
        .map_err(|e| Error::media(format!("unreadable ffprobe output: {e}")))?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| Error::media("file has no video stream"))?;

    let fps = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|r| parse_rate(r))
        .ok_or_else(|| Error::media("video has no usable frame rate"))?;

    let duration = stream
        .duration
        .as_deref()
        .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok());
    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(n) if n > 0 => n,
        _ => duration.map_or(0, |d| (d * fps).round() as u64),
    };

    Ok(VideoInfo::new(
        fps,
        frame_count,
        stream.width.unwrap_or(0),
        stream.height.unwrap_or(0),
        stream.codec_name.unwrap_or_default(),
    ))
}

/// `"30000/1001"` or `"25"` to frames per second. `0/0` is no rate.
fn parse_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let (num, den) = (num.trim().parse::<f64>().ok()?, den.trim().parse::<f64>().ok()?);
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse::<f64>().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}
