//! Response shapes that differ from the internal types.

use serde::Serialize;
use serde_json::Value;
use track::{TimeFormat, Waypoint};

/// A path sample as the frontend expects it: `lng`, and the timestamp in the
/// encoding the request used.
#[derive(Debug, Serialize)]
pub struct PointOut {
    pub timestamp: Value,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
}

impl PointOut {
    pub fn new(sample: &Waypoint, format: TimeFormat, frame: Option<String>) -> Self {
        Self {
            timestamp: format.render(sample.time),
            lat: sample.latitude,
            lng: sample.longitude,
            frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn longitude_goes_out_as_lng() {
        let p = PointOut::new(&Waypoint::new(65.0, 1.5, -2.5), TimeFormat::Mmss, None);
        assert_eq!(
            serde_json::to_value(p).unwrap(),
            json!({"timestamp": "0105", "lat": 1.5, "lng": -2.5})
        );
    }
}
