use serde::{Deserialize, Serialize};

/// A timestamped position. Used for authoritative waypoints and for the
/// synthetic samples the interpolator produces between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Seconds, in the unit chosen by the request's [`TimeFormat`](crate::TimeFormat).
    pub time: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(time: f64, latitude: f64, longitude: f64) -> Self {
        Self { time, latitude, longitude }
    }
}

/// Stable ascending sort by time.
pub fn sort_by_time(points: &mut [Waypoint]) {
    points.sort_by(|a, b| a.time.total_cmp(&b.time));
}
