use serde_json::json;
use track::align::align;
use track::interpolate::interpolate;
use track::marker::{normalize, parse_markers};
use track::stats::path_stats;
use track::time::{format_mmss, parse_mmss};
use track::video::Frame;
use track::{plan_path, Error, FrameSource, Method, Result, TelemetryRecord, TelemetryTable, TimeFormat, VideoInfo, Waypoint};

struct Clip {
    info: VideoInfo,
}

impl FrameSource for Clip {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_at_index(&mut self, index: u64) -> Result<Frame> {
        if index >= self.info.frame_count {
            return Err(Error::media("seek past end of stream"));
        }
        Ok(format!("frame-{index}").into_bytes())
    }
}

#[test]
fn mmss_round_trips() {
    for m in 0..60 {
        for s in [0, 1, 29, 59] {
            let text = format!("{m:02}{s:02}");
            assert_eq!(format_mmss(parse_mmss(&text).unwrap()), text);
        }
    }
}

#[test]
fn markers_are_sorted_before_interpolating() {
    let raw = parse_markers(r#"[{"timestamp":"10","lat":1,"lng":2},{"timestamp":"0","lat":0,"lng":0}]"#).unwrap();
    let waypoints = normalize(&raw, TimeFormat::Seconds).unwrap();
    let samples = interpolate(&waypoints, 5.0, Method::Linear).unwrap();
    assert_eq!(samples.first().unwrap().time, 0.0);
    assert_eq!(samples.last().unwrap(), &Waypoint::new(10.0, 1.0, 2.0));
}

#[test]
fn linear_scenario() {
    let points = [Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(10.0, 1.0, 1.0)];
    let samples = interpolate(&points, 5.0, Method::Linear).unwrap();
    assert_eq!(
        samples,
        vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(5.0, 0.5, 0.5),
            Waypoint::new(10.0, 1.0, 1.0),
        ]
    );
}

#[test]
fn huge_interval_keeps_only_endpoints() {
    let points = [Waypoint::new(3.0, 10.0, 20.0), Waypoint::new(7.0, 11.0, 21.0)];
    for method in [Method::Linear, Method::Cubic] {
        let samples = interpolate(&points, 1000.0, method).unwrap();
        assert_eq!(samples.first().unwrap().time, 3.0);
        assert_eq!(samples.len(), if method == Method::Linear { 2 } else { 1 });
    }
}

#[test]
fn both_methods_hit_the_waypoints() {
    let points = [
        Waypoint::new(0.0, 45.0, 7.0),
        Waypoint::new(4.0, 45.001, 7.002),
        Waypoint::new(8.0, 45.003, 7.001),
    ];
    for method in [Method::Linear, Method::Cubic] {
        let samples = interpolate(&points, 2.0, method).unwrap();
        for p in &points {
            let hit = samples.iter().find(|s| s.time == p.time).unwrap();
            assert!((hit.latitude - p.latitude).abs() < 1e-6, "{method:?}");
            assert!((hit.longitude - p.longitude).abs() < 1e-6, "{method:?}");
        }
    }
}

#[test]
fn stats_of_short_paths_are_zero() {
    let empty = path_stats(&[]);
    assert_eq!(empty.point_count, 0);
    assert_eq!(empty.total_distance, 0.0);
    let one = path_stats(&[Waypoint::new(1.0, 2.0, 3.0)]);
    assert_eq!(one.point_count, 1);
    assert_eq!(one.duration, 0.0);
    assert_eq!(one.average_speed, 0.0);
}

#[test]
fn empty_telemetry_is_not_found() {
    let table = TelemetryTable::default();
    let at = chrono::DateTime::from_timestamp(0, 0).unwrap();
    assert!(matches!(table.nearest(at), Err(Error::NotFound(_))));
}

#[test]
fn nearest_row_scenario() {
    let base = chrono::DateTime::from_timestamp(1_600_000_000, 0).unwrap();
    let table = TelemetryTable::new(
        [0, 10, 20]
            .iter()
            .map(|s| TelemetryRecord::new(base + chrono::Duration::seconds(*s), *s as f64, 0.0, 0.0))
            .collect(),
    );
    assert_eq!(table.nearest(base + chrono::Duration::seconds(14)).unwrap().latitude, 10.0);
    assert_eq!(table.nearest(base + chrono::Duration::seconds(16)).unwrap().latitude, 20.0);
}

#[test]
fn planned_path_aligns_with_frames() {
    let markers = vec![
        json!({"timestamp": "0000", "lat": 0, "lng": 0}),
        json!({"timestamp": "0004", "lat": 0.001, "lon": 0.001}),
        json!({"timestamp": "0010", "lat": 0.002, "lng": 0.002}),
    ];
    let plan = plan_path(&markers, TimeFormat::Mmss, 2.0, Method::Cubic).unwrap();
    assert_eq!(plan.samples.len(), 6);
    assert!(plan.stats.total_distance > 0.0);

    // A 9 second clip: the 10 second sample has no frame and is dropped.
    let mut clip = Clip { info: VideoInfo::new(10.0, 90, 4, 4, "h264") };
    let aligned = align(&plan.frame_times(), &mut clip, |i, _| plan.samples[i]);
    assert_eq!(aligned.len(), 5);
    assert_eq!(aligned[1].frame, b"frame-20".to_vec());
    assert_eq!(aligned[1].location.time, 2.0);
    assert!(aligned.windows(2).all(|w| w[0].time < w[1].time));
}

#[test]
fn duplicate_times_break_the_spline_only() {
    let points = [
        Waypoint::new(0.0, 0.0, 0.0),
        Waypoint::new(0.0, 1.0, 1.0),
        Waypoint::new(5.0, 2.0, 2.0),
    ];
    assert!(interpolate(&points, 1.0, Method::Linear).is_ok());
    assert!(matches!(
        interpolate(&points, 1.0, Method::Cubic),
        Err(Error::Interpolation(_))
    ));
}
