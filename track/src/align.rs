//! Pairing target instants with decoded frames.

use tracing::{debug, warn};

use crate::video::{Frame, FrameSource};

/// A location (or telemetry) value together with the frame decoded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Aligned<L> {
    /// Seconds into the video.
    pub time: f64,
    pub location: L,
    pub frame: Frame,
}

/// Decode one frame per target time and pair it with `locate(i, time)`.
///
/// Targets whose frame cannot be decoded are dropped together with their
/// location; the remaining records keep the input order.
pub fn align<L, F>(targets: &[f64], frames: &mut dyn FrameSource, mut locate: F) -> Vec<Aligned<L>>
where
    F: FnMut(usize, f64) -> L,
{
    let mut out = Vec::with_capacity(targets.len());
    for (i, &time) in targets.iter().enumerate() {
        match frames.frame_at_time(time) {
            Ok(frame) => out.push(Aligned { time, location: locate(i, time), frame }),
            Err(e) => warn!(index = i, time, error = %e, "no frame for target, dropping"),
        }
    }
    debug!(requested = targets.len(), aligned = out.len(), "aligned frames");
    out
}

/// Frame indices for a fixed-count sampling of `total` frames.
///
/// With fewer frames than `max_frames` the step is `interval`; otherwise it is
/// widened to spread `max_frames` samples over the whole video.
pub fn frame_indices(total: u64, max_frames: usize, interval: u64) -> Vec<u64> {
    if max_frames == 0 || total == 0 {
        return Vec::new();
    }
    let interval = interval.max(1);
    let step = if total < max_frames as u64 {
        interval
    } else {
        interval.max(total / max_frames as u64)
    };
    (0..total).step_by(step as usize).take(max_frames).collect()
}

/// Decode frames at `indices`, stopping at the first one that fails.
pub fn sample_frames(frames: &mut dyn FrameSource, indices: &[u64]) -> Vec<(u64, Frame)> {
    let mut out = Vec::with_capacity(indices.len());
    for &index in indices {
        match frames.frame_at_index(index) {
            Ok(frame) => out.push((index, frame)),
            Err(e) => {
                warn!(index, error = %e, "frame extraction failed, stopping");
                break;
            }
        }
    }
    out
}
