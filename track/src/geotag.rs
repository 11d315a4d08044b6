//! Batch geotagging of video frames from a flight log.
//!
//! A [`Geotagger`] run moves through
//! `Idle -> TelemetryLoaded -> VideoLoaded -> Processing -> Done | Failed`.
//! Calling a step out of order fails the run with [`Error::Precondition`].
//! Per-frame decode or write failures are logged and skipped; failing to
//! load the telemetry or open the video aborts the run.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::telemetry::{closest_time, TelemetryRecord, TelemetryTable};
use crate::video::FrameSource;

/// A frame only matches a log row when it falls this close to it.
pub const MATCH_TOLERANCE_MS: i64 = 100;

/// Which frames of the video get geotagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingPolicy {
    /// Walk every frame and keep those within [`MATCH_TOLERANCE_MS`] of a
    /// log timestamp, at most one frame per timestamp.
    AllTimestamps,
    /// Keep one frame every `n` seconds, tagged with the nearest log row.
    FixedInterval(f64),
}

/// Writes a tagged frame somewhere durable and reports where.
pub trait FrameSink {
    fn persist(&mut self, frame: &[u8], telemetry: &TelemetryRecord, at: DateTime<Utc>) -> Result<PathBuf>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedFrame {
    pub timestamp: DateTime<Utc>,
    pub path: PathBuf,
    pub telemetry: TelemetryRecord,
    pub frame_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    TelemetryLoaded,
    VideoLoaded,
    Processing,
    Done,
    Failed,
}

pub struct Geotagger<K> {
    policy: SamplingPolicy,
    sink: K,
    state: RunState,
    telemetry: Option<TelemetryTable>,
    video: Option<Box<dyn FrameSource + Send>>,
}

impl<K: FrameSink> Geotagger<K> {
    pub fn new(policy: SamplingPolicy, sink: K) -> Result<Self> {
        if let SamplingPolicy::FixedInterval(secs) = policy {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(Error::validation(format!(
                    "frame interval must be a positive number of seconds, got {secs}"
                )));
            }
        }
        Ok(Self {
            policy,
            sink,
            state: RunState::Idle,
            telemetry: None,
            video: None,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn load_telemetry<F>(&mut self, load: F) -> Result<()>
    where
        F: FnOnce() -> Result<TelemetryTable>,
    {
        self.require(RunState::Idle, "load telemetry")?;
        let table = load().and_then(|t| {
            if t.is_empty() {
                Err(Error::NotFound("telemetry log has no rows".into()))
            } else {
                Ok(t)
            }
        });
        match table {
            Ok(t) => {
                info!(rows = t.len(), "telemetry loaded");
                self.telemetry = Some(t);
                self.state = RunState::TelemetryLoaded;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn load_video<F>(&mut self, open: F) -> Result<()>
    where
        F: FnOnce() -> Result<Box<dyn FrameSource + Send>>,
    {
        self.require(RunState::TelemetryLoaded, "load video")?;
        let video = open().and_then(|v| {
            if v.info().fps > 0.0 {
                Ok(v)
            } else {
                Err(Error::media("video reports no frame rate"))
            }
        });
        match video {
            Ok(v) => {
                let info = v.info();
                info!(fps = info.fps, frames = info.frame_count, "video loaded");
                self.video = Some(v);
                self.state = RunState::VideoLoaded;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Run the sampling policy. The video is released before this returns.
    pub fn process(&mut self) -> Result<Vec<SavedFrame>> {
        self.require(RunState::VideoLoaded, "process")?;
        self.state = RunState::Processing;
        let (Some(mut video), Some(table)) = (self.video.take(), self.telemetry.take()) else {
            return Err(self.fail(Error::Precondition("video and telemetry must be loaded".into())));
        };

        let result = match self.policy {
            SamplingPolicy::AllTimestamps => all_timestamps(video.as_mut(), &table, &mut self.sink),
            SamplingPolicy::FixedInterval(secs) => {
                fixed_interval(video.as_mut(), &table, &mut self.sink, secs)
            }
        };
        drop(video);

        match result {
            Ok(saved) => {
                self.state = RunState::Done;
                Ok(saved)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn require(&mut self, want: RunState, action: &str) -> Result<()> {
        if self.state == want {
            return Ok(());
        }
        let e = Error::Precondition(format!("cannot {action} while {:?}", self.state));
        Err(self.fail(e))
    }

    fn fail(&mut self, e: Error) -> Error {
        warn!(state = ?self.state, error = %e, "geotagging run failed");
        self.state = RunState::Failed;
        self.video = None;
        self.telemetry = None;
        e
    }
}

fn offset(index: u64, fps: f64) -> Duration {
    Duration::microseconds((index as f64 / fps * 1e6).round() as i64)
}

fn all_timestamps<K: FrameSink>(
    video: &mut dyn FrameSource,
    table: &TelemetryTable,
    sink: &mut K,
) -> Result<Vec<SavedFrame>> {
    let (fps, frame_count) = (video.info().fps, video.info().frame_count);
    let start = table
        .start_time()
        .ok_or_else(|| Error::NotFound("telemetry log has no rows".into()))?;
    let times = table.unique_times();
    let tolerance = Duration::milliseconds(MATCH_TOLERANCE_MS);
    info!(timestamps = times.len(), frames = frame_count, "matching frames to every log timestamp");

    let mut used = HashSet::new();
    let mut saved = Vec::new();
    for index in 0..frame_count {
        let current = start + offset(index, fps);
        let Some((closest, diff)) = closest_time(&times, current) else {
            break;
        };
        if diff >= tolerance || used.contains(&closest) {
            continue;
        }
        debug!(index, %closest, "frame matches log timestamp");
        if let Some(frame) = tag_frame(video, table, sink, index, closest)? {
            used.insert(closest);
            saved.push(frame);
        }
    }
    info!(visited = frame_count, saved = saved.len(), "geotagging finished");
    Ok(saved)
}

fn fixed_interval<K: FrameSink>(
    video: &mut dyn FrameSource,
    table: &TelemetryTable,
    sink: &mut K,
    interval: f64,
) -> Result<Vec<SavedFrame>> {
    let (fps, frame_count) = (video.info().fps, video.info().frame_count);
    let start = table
        .start_time()
        .ok_or_else(|| Error::NotFound("telemetry log has no rows".into()))?;
    let step = ((fps * interval).round() as u64).max(1);
    info!(interval, step, frames = frame_count, "sampling frames at a fixed interval");

    let mut saved = Vec::new();
    for index in (0..frame_count).step_by(step as usize) {
        let at = start + offset(index, fps);
        if let Some(frame) = tag_frame(video, table, sink, index, at)? {
            saved.push(frame);
        }
        if !saved.is_empty() && saved.len() % 10 == 0 {
            debug!(saved = saved.len(), "progress");
        }
    }
    info!(saved = saved.len(), "geotagging finished");
    Ok(saved)
}

/// Decode, match, and persist one frame. `Ok(None)` means the frame was skipped.
fn tag_frame<K: FrameSink>(
    video: &mut dyn FrameSource,
    table: &TelemetryTable,
    sink: &mut K,
    index: u64,
    at: DateTime<Utc>,
) -> Result<Option<SavedFrame>> {
    let frame = match video.frame_at_index(index) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(index, error = %e, "frame extraction failed, skipping");
            return Ok(None);
        }
    };
    let telemetry = table.nearest(at)?.clone();
    match sink.persist(&frame, &telemetry, at) {
        Ok(path) => Ok(Some(SavedFrame {
            timestamp: at,
            path,
            telemetry,
            frame_number: index,
        })),
        Err(e) => {
            warn!(index, error = %e, "frame write failed, skipping");
            Ok(None)
        }
    }
}
