//! Time-indexed flight log and nearest-sample lookup.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// One row of a flight controller log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    #[serde(skip)]
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_above_takeoff: Option<f64>,
    /// Meters per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compass_heading: Option<f64>,
}

impl TelemetryRecord {
    pub fn new(time: DateTime<Utc>, latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            time,
            latitude,
            longitude,
            altitude,
            height_above_takeoff: None,
            speed: None,
            compass_heading: None,
        }
    }
}

/// Immutable telemetry log in file order, with a time index for lookups.
#[derive(Debug, Clone, Default)]
pub struct TelemetryTable {
    records: Vec<TelemetryRecord>,
    /// Row indices ordered by time; rows sharing a time stay in file order.
    by_time: Vec<usize>,
}

impl TelemetryTable {
    pub fn new(records: Vec<TelemetryRecord>) -> Self {
        let mut by_time: Vec<usize> = (0..records.len()).collect();
        by_time.sort_by_key(|&i| records[i].time);
        Self { records, by_time }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// Time of the first row, which anchors the video timeline.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.records.first().map(|r| r.time)
    }

    /// Distinct timestamps, ascending.
    pub fn unique_times(&self) -> Vec<DateTime<Utc>> {
        let seen: BTreeSet<_> = self.records.iter().map(|r| r.time).collect();
        seen.into_iter().collect()
    }

    /// Record whose timestamp is closest to `at`. Ties go to the earlier row.
    /// Queries outside the logged range resolve to the nearest edge row.
    pub fn nearest(&self, at: DateTime<Utc>) -> Result<&TelemetryRecord> {
        let time = |k: usize| self.records[self.by_time[k]].time;
        let after = self.by_time.partition_point(|&i| self.records[i].time < at);

        // First row (in file order) of the run at or after `at`, and of the
        // run just before it.
        let mut candidates = Vec::with_capacity(2);
        if after < self.by_time.len() {
            candidates.push(self.by_time[after]);
        }
        if after > 0 {
            let before = time(after - 1);
            let first = self.by_time.partition_point(|&i| self.records[i].time < before);
            candidates.push(self.by_time[first]);
        }

        candidates
            .into_iter()
            .min_by_key(|&i| (abs_micros(self.records[i].time, at), i))
            .map(|i| &self.records[i])
            .ok_or_else(|| Error::NotFound("telemetry table is empty".into()))
    }
}

/// Closest of the ascending `candidates` to `at` and its distance. The
/// earlier time wins a tie.
pub fn closest_time(
    candidates: &[DateTime<Utc>],
    at: DateTime<Utc>,
) -> Option<(DateTime<Utc>, chrono::Duration)> {
    let after = candidates.partition_point(|t| *t < at);
    let lo = after.checked_sub(1).map(|k| candidates[k]);
    let hi = candidates.get(after).copied();
    let best = match (lo, hi) {
        (Some(lo), Some(hi)) if abs_micros(hi, at) < abs_micros(lo, at) => hi,
        (Some(lo), _) => lo,
        (None, Some(hi)) => hi,
        (None, None) => return None,
    };
    Some((best, chrono::Duration::microseconds(abs_micros(best, at))))
}

fn abs_micros(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_microseconds().map_or(i64::MAX, i64::abs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn table(secs: &[i64]) -> TelemetryTable {
        TelemetryTable::new(
            secs.iter()
                .enumerate()
                .map(|(i, s)| TelemetryRecord::new(at(*s), i as f64, 0.0, 0.0))
                .collect(),
        )
    }

    #[test]
    fn nearest_neighbour() {
        let t = table(&[0, 10, 20]);
        assert_eq!(t.nearest(at(14)).unwrap().time, at(10));
        assert_eq!(t.nearest(at(16)).unwrap().time, at(20));
    }

    #[test]
    fn ties_go_to_the_first_row() {
        let t = table(&[0, 10, 20]);
        assert_eq!(t.nearest(at(5)).unwrap().time, at(0));
        let dup = table(&[10, 10]);
        assert_eq!(dup.nearest(at(10)).unwrap().latitude, 0.0);
    }

    #[test]
    fn clamps_outside_the_range() {
        let t = table(&[0, 10, 20]);
        assert_eq!(t.nearest(at(-100)).unwrap().time, at(0));
        assert_eq!(t.nearest(at(1000)).unwrap().time, at(20));
    }

    #[test]
    fn empty_table_is_not_found() {
        let t = TelemetryTable::default();
        assert!(matches!(t.nearest(at(0)), Err(Error::NotFound(_))));
    }

    #[test]
    fn unique_times_are_sorted() {
        let t = table(&[5, 5, 0, 10, 0]);
        assert_eq!(t.unique_times(), vec![at(0), at(5), at(10)]);
        assert_eq!(t.start_time(), Some(at(5)));
    }

    #[test]
    fn unsorted_log_matches_a_linear_scan() {
        // Rows out of time order, with repeated times at 10 and 30.
        let t = table(&[30, 10, 20, 10, 0, 30]);
        for q in -5..40 {
            let scan = t
                .records()
                .iter()
                .enumerate()
                .min_by_key(|(i, r)| ((r.time - at(q)).num_microseconds().unwrap().abs(), *i))
                .map(|(_, r)| r)
                .unwrap();
            assert_eq!(t.nearest(at(q)).unwrap(), scan, "query {q}");
        }
        // 15 is equidistant from 10 and 20: row 1 (t=10) precedes row 2 (t=20).
        assert_eq!(t.nearest(at(15)).unwrap().latitude, 1.0);
        // 25 is equidistant from 20 (row 2) and 30 (row 0): row 0 wins.
        assert_eq!(t.nearest(at(25)).unwrap().latitude, 0.0);
    }

    #[test]
    fn closest_candidate() {
        let (t, d) = closest_time(&[at(0), at(1)], at(0) + Duration::milliseconds(900)).unwrap();
        assert_eq!(t, at(1));
        assert_eq!(d, Duration::milliseconds(100));
        assert_eq!(closest_time(&[at(0), at(2)], at(1)).unwrap().0, at(0));
        assert_eq!(closest_time(&[at(0), at(2)], at(5)).unwrap().0, at(2));
        assert_eq!(closest_time(&[at(3)], at(-5)).unwrap().0, at(3));
        assert!(closest_time(&[], at(0)).is_none());
    }
}
