use serde::Serialize;

use crate::geo::haversine_distance_m;
use crate::waypoint::Waypoint;

/// Summary of a sampled path. Distances in meters, speeds in meters per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PathStats {
    pub total_distance: f64,
    pub duration: f64,
    pub average_speed: f64,
    pub max_speed: f64,
    pub point_count: usize,
}

/// Compute [`PathStats`] over consecutive samples in the order given.
pub fn path_stats(samples: &[Waypoint]) -> PathStats {
    if samples.len() < 2 {
        return PathStats { point_count: samples.len(), ..PathStats::default() };
    }

    let mut total_distance = 0.0;
    let mut max_speed: f64 = 0.0;
    for pair in samples.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let d = haversine_distance_m(a.latitude, a.longitude, b.latitude, b.longitude);
        total_distance += d;
        let dt = b.time - a.time;
        if dt > 0.0 {
            max_speed = max_speed.max(d / dt);
        }
    }

    let duration = samples[samples.len() - 1].time - samples[0].time;
    let average_speed = if duration > 0.0 { total_distance / duration } else { 0.0 };

    PathStats {
        total_distance,
        duration,
        average_speed,
        max_speed,
        point_count: samples.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single() {
        assert_eq!(path_stats(&[]), PathStats::default());
        let one = path_stats(&[Waypoint::new(3.0, 1.0, 1.0)]);
        assert_eq!(one.point_count, 1);
        assert_eq!(one.total_distance, 0.0);
        assert_eq!(one.duration, 0.0);
        assert_eq!(one.average_speed, 0.0);
    }

    #[test]
    fn distance_duration_speed() {
        let pts = [
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(10.0, 0.001, 0.0),
            Waypoint::new(30.0, 0.002, 0.0),
        ];
        let s = path_stats(&pts);
        let leg = haversine_distance_m(0.0, 0.0, 0.001, 0.0);
        assert!((s.total_distance - 2.0 * leg).abs() < 1e-9);
        assert_eq!(s.duration, 30.0);
        assert!((s.average_speed - 2.0 * leg / 30.0).abs() < 1e-9);
        assert!((s.max_speed - leg / 10.0).abs() < 1e-9);
        assert_eq!(s.point_count, 3);
    }

    #[test]
    fn zero_duration_is_zero_speed() {
        let pts = [Waypoint::new(5.0, 0.0, 0.0), Waypoint::new(5.0, 1.0, 1.0)];
        let s = path_stats(&pts);
        assert!(s.total_distance > 0.0);
        assert_eq!(s.average_speed, 0.0);
        assert_eq!(s.max_speed, 0.0);
    }
}
