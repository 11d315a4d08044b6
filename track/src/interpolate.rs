//! Densify a sparse waypoint path at a fixed time step.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spline::NaturalCubicSpline;
use crate::waypoint::{sort_by_time, Waypoint};

/// Upper bound on generated samples per call.
pub const MAX_SAMPLES: usize = 100_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Pairwise straight lines; every waypoint is kept.
    #[default]
    Linear,
    /// One natural spline per axis over the whole path, sampled on a regular grid.
    Cubic,
}

impl Method {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "cubic" | "spline" => Ok(Self::Cubic),
            other => Err(Error::validation(format!(
                "unknown interpolation method '{other}'"
            ))),
        }
    }
}

/// Interpolate `waypoints` every `interval` seconds.
///
/// Input order does not matter; points are stably sorted by time first.
/// Fewer than two points are returned as given.
pub fn interpolate(waypoints: &[Waypoint], interval: f64, method: Method) -> Result<Vec<Waypoint>> {
    if !(interval.is_finite() && interval > 0.0) {
        return Err(Error::validation(format!(
            "interval must be a positive number of seconds, got {interval}"
        )));
    }
    let mut points = waypoints.to_vec();
    sort_by_time(&mut points);
    if points.len() < 2 {
        return Ok(points);
    }

    let span = points[points.len() - 1].time - points[0].time;
    if span / interval + points.len() as f64 > MAX_SAMPLES as f64 {
        return Err(Error::validation(format!(
            "interval {interval}s over {span}s would produce more than {MAX_SAMPLES} samples"
        )));
    }

    match method {
        Method::Linear => Ok(linear(&points, interval)),
        Method::Cubic => cubic(&points, interval),
    }
}

fn linear(points: &[Waypoint], interval: f64) -> Vec<Waypoint> {
    let first = points[0];
    let last = points[points.len() - 1];
    if last.time == first.time {
        return vec![first];
    }

    let mut out = Vec::new();
    for pair in points.windows(2) {
        let (p0, p1) = (pair[0], pair[1]);
        let span = p1.time - p0.time;
        if span <= 0.0 {
            out.push(p0);
            continue;
        }
        let n = ((span / interval).floor() as usize).max(1);
        // The shared boundary is emitted by the next pair (or the final push).
        for k in 0..n {
            let progress = k as f64 / n as f64;
            out.push(Waypoint {
                time: p0.time + span * progress,
                latitude: p0.latitude + progress * (p1.latitude - p0.latitude),
                longitude: p0.longitude + progress * (p1.longitude - p0.longitude),
            });
        }
    }
    out.push(last);
    out
}

fn cubic(points: &[Waypoint], interval: f64) -> Result<Vec<Waypoint>> {
    let times: Vec<f64> = points.iter().map(|p| p.time).collect();
    if times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::Interpolation(
            "cubic interpolation needs waypoints with distinct timestamps".into(),
        ));
    }
    let lats: Vec<f64> = points.iter().map(|p| p.latitude).collect();
    let lons: Vec<f64> = points.iter().map(|p| p.longitude).collect();
    let lat = NaturalCubicSpline::fit(&times, &lats)?;
    let lon = NaturalCubicSpline::fit(&times, &lons)?;

    let start = times[0];
    let end = times[times.len() - 1];
    // Grid points past the last waypoint are dropped, not extrapolated.
    let steps = ((end - start) / interval + 1e-9).floor() as usize;
    Ok((0..=steps)
        .map(|k| {
            let t = start + k as f64 * interval;
            Waypoint {
                time: t,
                latitude: round6(lat.eval(t)),
                longitude: round6(lon.eval(t)),
            }
        })
        .collect())
}

/// Round to 6 decimal places (about 0.11 m at the equator).
fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(t: f64, lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(t, lat, lon)
    }

    #[test]
    fn linear_two_points_every_five_seconds() {
        let out = interpolate(&[wp(0.0, 0.0, 0.0), wp(10.0, 1.0, 1.0)], 5.0, Method::Linear).unwrap();
        assert_eq!(out, vec![wp(0.0, 0.0, 0.0), wp(5.0, 0.5, 0.5), wp(10.0, 1.0, 1.0)]);
    }

    #[test]
    fn linear_interval_longer_than_path_keeps_endpoints() {
        let pts = [wp(3.0, 10.0, 20.0), wp(7.0, 11.0, 21.0)];
        let out = interpolate(&pts, 1000.0, Method::Linear).unwrap();
        assert_eq!(out, pts.to_vec());
    }

    #[test]
    fn linear_keeps_every_waypoint_once() {
        let pts = [wp(0.0, 0.0, 0.0), wp(4.0, 4.0, 0.0), wp(7.0, 4.0, 3.0)];
        let out = interpolate(&pts, 1.0, Method::Linear).unwrap();
        for p in pts {
            assert_eq!(out.iter().filter(|o| **o == p).count(), 1);
        }
        assert_eq!(out.len(), 8);
        assert!(out.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn sorts_before_interpolating() {
        let out = interpolate(&[wp(10.0, 1.0, 2.0), wp(0.0, 0.0, 0.0)], 5.0, Method::Linear).unwrap();
        assert_eq!(out[0].time, 0.0);
        assert_eq!(out.last().unwrap().time, 10.0);
    }

    #[test]
    fn single_point_passes_through() {
        let pts = [wp(1.0, 2.0, 3.0)];
        assert_eq!(interpolate(&pts, 1.0, Method::Cubic).unwrap(), pts.to_vec());
    }

    #[test]
    fn identical_timestamps() {
        let pts = [wp(5.0, 1.0, 1.0), wp(5.0, 2.0, 2.0)];
        assert_eq!(interpolate(&pts, 1.0, Method::Linear).unwrap(), vec![pts[0]]);
        assert!(matches!(
            interpolate(&pts, 1.0, Method::Cubic),
            Err(Error::Interpolation(_))
        ));
    }

    #[test]
    fn cubic_hits_waypoints_on_the_grid() {
        let pts = [wp(0.0, 45.0, 7.0), wp(10.0, 45.001, 7.002), wp(20.0, 45.0005, 7.004)];
        let out = interpolate(&pts, 5.0, Method::Cubic).unwrap();
        assert_eq!(out.len(), 5);
        for p in pts {
            let s = out.iter().find(|s| s.time == p.time).unwrap();
            assert!((s.latitude - p.latitude).abs() < 1e-6);
            assert!((s.longitude - p.longitude).abs() < 1e-6);
        }
    }

    #[test]
    fn cubic_grid_stops_at_last_waypoint() {
        let pts = [wp(0.0, 0.0, 0.0), wp(10.0, 1.0, 1.0)];
        let out = interpolate(&pts, 3.0, Method::Cubic).unwrap();
        let times: Vec<f64> = out.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(out[1].latitude, 0.3);
    }

    #[test]
    fn rejects_bad_intervals() {
        let pts = [wp(0.0, 0.0, 0.0), wp(10.0, 1.0, 1.0)];
        for interval in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                interpolate(&pts, interval, Method::Linear),
                Err(Error::Validation(_))
            ));
        }
        assert!(interpolate(&pts, 1e-6, Method::Linear).is_err());
    }

    #[test]
    fn deterministic() {
        let pts = [wp(0.0, 1.0, 2.0), wp(3.0, 1.5, 2.5), wp(9.0, 0.5, 3.0)];
        for method in [Method::Linear, Method::Cubic] {
            assert_eq!(
                interpolate(&pts, 0.5, method).unwrap(),
                interpolate(&pts, 0.5, method).unwrap()
            );
        }
    }
}
