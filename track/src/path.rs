use serde_json::Value;

use crate::error::{Error, Result};
use crate::interpolate::{interpolate, Method};
use crate::marker::normalize;
use crate::stats::{path_stats, PathStats};
use crate::time::TimeFormat;
use crate::waypoint::Waypoint;

/// Interpolated path for one request, ready to be aligned with a video.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPlan {
    pub format: TimeFormat,
    pub samples: Vec<Waypoint>,
    pub stats: PathStats,
    /// Sample time that corresponds to the first video frame.
    pub origin: f64,
}

impl PathPlan {
    /// Offsets into the video, one per sample.
    pub fn frame_times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time - self.origin).collect()
    }
}

/// Normalize markers, interpolate, and summarise. Runs before any decoding so
/// malformed input is rejected cheaply.
pub fn plan_path(markers: &[Value], format: TimeFormat, interval: f64, method: Method) -> Result<PathPlan> {
    if markers.is_empty() {
        return Err(Error::validation("at least one marker is required"));
    }
    // MMSS output has whole-second resolution; finer steps would repeat timestamps.
    if format == TimeFormat::Mmss && interval.fract() != 0.0 {
        return Err(Error::validation(format!(
            "frames_interval {interval} must be a whole number of seconds for MMSS timestamps"
        )));
    }
    let waypoints = normalize(markers, format)?;
    let samples = interpolate(&waypoints, interval, method)?;
    let stats = path_stats(&samples);
    let origin = match samples.first() {
        Some(first) if format.is_absolute() => first.time,
        _ => 0.0,
    };
    Ok(PathPlan { format, samples, stats, origin })
}
