use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Runtime settings, read from flags, the environment, or a `.env` file.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Video geotagging and GPS path alignment service")]
pub struct Config {
    /// Address to bind the HTTP server
    #[arg(long, env = "GEOTAG_ADDR", default_value = "127.0.0.1:5000")]
    pub addr: SocketAddr,
    /// Directory geotagged frames are written to and served from
    #[arg(long, env = "GEOTAG_OUTPUT_DIR", default_value = "drone_frames")]
    pub output_dir: PathBuf,
    /// Longest video accepted for path interpolation, in seconds
    #[arg(long, env = "GEOTAG_MAX_VIDEO_SECONDS", default_value_t = 120.0)]
    pub max_video_seconds: f64,
    /// Request body limit in megabytes
    #[arg(long, env = "GEOTAG_MAX_UPLOAD_MB", default_value_t = 512)]
    pub max_upload_mb: usize,
    /// Frames returned inline are scaled down to at most this width
    #[arg(long, env = "GEOTAG_PREVIEW_WIDTH", default_value_t = 1280)]
    pub preview_width: u32,
    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,
    #[arg(long, env = "FFPROBE_BIN", default_value = "ffprobe")]
    pub ffprobe: PathBuf,
}

impl Config {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            output_dir: PathBuf::from("drone_frames"),
            max_video_seconds: 120.0,
            max_upload_mb: 512,
            preview_width: 1280,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}
