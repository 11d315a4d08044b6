//! Normalization of raw marker records into [`Waypoint`]s.
//!
//! Markers arrive as loosely typed JSON objects `{timestamp, lat, lng}`.
//! `lon` is accepted in place of `lng`; numeric strings are accepted for the
//! coordinates. The longitude key alias lives only here and in the response
//! serializer, never inside [`Waypoint`].

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::geo::{valid_latitude, valid_longitude};
use crate::time::TimeFormat;
use crate::waypoint::Waypoint;

const LATITUDE_KEYS: [&str; 2] = ["lat", "latitude"];
const LONGITUDE_KEYS: [&str; 3] = ["lng", "lon", "longitude"];

/// Parse a JSON array of markers, as posted in a form field.
pub fn parse_markers(json: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(Error::validation("markers must be a JSON array")),
        Err(e) => Err(Error::validation(format!("invalid JSON in markers: {e}"))),
    }
}

/// Validate and convert every record, failing on the first bad one.
pub fn normalize(raw: &[Value], format: TimeFormat) -> Result<Vec<Waypoint>> {
    raw.iter()
        .enumerate()
        .map(|(i, record)| {
            normalize_one(record, format)
                .map_err(|e| Error::validation(format!("marker {i}: {e}")))
        })
        .collect()
}

fn normalize_one(record: &Value, format: TimeFormat) -> Result<Waypoint> {
    let obj = record
        .as_object()
        .ok_or_else(|| Error::validation("record is not an object"))?;

    let time = format.parse(field(obj, &["timestamp"])?)?;
    let latitude = coordinate(field(obj, &LATITUDE_KEYS)?, "lat")?;
    let longitude = coordinate(field(obj, &LONGITUDE_KEYS)?, "lng")?;

    if !valid_latitude(latitude) {
        return Err(Error::validation(format!("latitude {latitude} outside [-90, 90]")));
    }
    if !valid_longitude(longitude) {
        return Err(Error::validation(format!("longitude {longitude} outside [-180, 180]")));
    }
    Ok(Waypoint { time, latitude, longitude })
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Result<&'a Value> {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
        .ok_or_else(|| Error::validation(format!("missing field '{}'", keys.join("' or '"))))
}

fn coordinate(value: &Value, name: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::validation(format!("{name} {value} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_lng_and_lon() {
        let raw = vec![
            json!({"timestamp": 0, "lat": 1.0, "lng": 2.0}),
            json!({"timestamp": "5", "lat": "1.5", "lon": 2.5}),
        ];
        let pts = normalize(&raw, TimeFormat::Seconds).unwrap();
        assert_eq!(pts[0], Waypoint::new(0.0, 1.0, 2.0));
        assert_eq!(pts[1], Waypoint::new(5.0, 1.5, 2.5));
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let raw = vec![json!({"timestamp": 0, "lat": 1.0})];
        let err = normalize(&raw, TimeFormat::Seconds).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("lng")), "{err}");
    }

    #[test]
    fn rejects_non_numeric_coordinates_and_bad_ranges() {
        for rec in [
            json!({"timestamp": 0, "lat": "north", "lng": 0}),
            json!({"timestamp": 0, "lat": 91, "lng": 0}),
            json!({"timestamp": 0, "lat": 0, "lng": -181}),
            json!("not an object"),
        ] {
            assert!(normalize(&[rec], TimeFormat::Seconds).is_err());
        }
    }

    #[test]
    fn mmss_markers() {
        let raw = vec![json!({"timestamp": "0105", "lat": 0, "lng": 0})];
        assert_eq!(normalize(&raw, TimeFormat::Mmss).unwrap()[0].time, 65.0);
        let bad = vec![json!({"timestamp": "0165", "lat": 0, "lng": 0})];
        assert!(normalize(&bad, TimeFormat::Mmss).is_err());
    }

    #[test]
    fn markers_field_must_be_an_array() {
        assert!(parse_markers("[]").unwrap().is_empty());
        assert!(parse_markers("{}").is_err());
        assert!(parse_markers("[").is_err());
    }
}
