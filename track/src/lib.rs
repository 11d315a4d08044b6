//! GPS track and video alignment primitives.
//!
//! Waypoints come in as loosely typed markers, get normalized by
//! [`marker::normalize`], resampled by [`interpolate::interpolate`], and are
//! then paired with decoded frames through the [`video::FrameSource`] seam.
//! Flight logs are matched to frames by [`geotag::Geotagger`].
//!
//! Nothing here touches the filesystem or spawns processes; decoders and
//! writers live behind the [`video::VideoOpener`] and [`geotag::FrameSink`]
//! traits.

pub mod align;
pub mod error;
pub mod geo;
pub mod geotag;
pub mod interpolate;
pub mod marker;
pub mod path;
pub mod spline;
pub mod stats;
pub mod telemetry;
pub mod time;
pub mod video;
pub mod waypoint;

pub use error::{Error, Result};
pub use geotag::{FrameSink, Geotagger, RunState, SamplingPolicy, SavedFrame};
pub use interpolate::Method;
pub use path::{plan_path, PathPlan};
pub use stats::PathStats;
pub use telemetry::{TelemetryRecord, TelemetryTable};
pub use time::TimeFormat;
pub use video::{Frame, FrameSource, VideoInfo, VideoOpener};
pub use waypoint::Waypoint;
