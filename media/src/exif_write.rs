//! Writing GPS tags into JPEG files.
//!
//! The image's existing EXIF is read back, its GPS position tags are swapped
//! for the new ones, and the result is re-encoded with kamadak's writer into
//! a single `Exif` APP1 segment. Every other segment and the scan data are
//! copied through untouched.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;
use track::{Error, Result};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";
const SEGMENT_MAX: usize = u16::MAX as usize;

/// Offsets the writer computes for itself.
const LAYOUT_TAGS: [Tag; 9] = [
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
];

/// GPS fields as posted to `/write-metadata`. Coordinates are `[d, m, s]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_latitude_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_longitude_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_altitude_ref: Option<String>,
}

impl GpsFields {
    /// Parse and validate the `metadata` form field.
    pub fn parse(json: &str) -> Result<Self> {
        let fields: Self = serde_json::from_str(json)
            .map_err(|e| Error::validation(format!("invalid GPS metadata: {e}")))?;
        fields.validate()?;
        Ok(fields)
    }

    /// Signed decimal position, as logged by a flight controller.
    pub fn from_position(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            gps_latitude: Some(to_dms(latitude)),
            gps_latitude_ref: Some(if latitude >= 0.0 { "N" } else { "S" }.into()),
            gps_longitude: Some(to_dms(longitude)),
            gps_longitude_ref: Some(if longitude >= 0.0 { "E" } else { "W" }.into()),
            gps_altitude: Some(altitude.abs()),
            gps_altitude_ref: Some(
                if altitude >= 0.0 { "ABOVE_SEA_LEVEL" } else { "BELOW_SEA_LEVEL" }.into(),
            ),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.gps_latitude.is_none() && self.gps_longitude.is_none() && self.gps_altitude.is_none() {
            return Err(Error::validation(
                "metadata needs gps_latitude, gps_longitude or gps_altitude",
            ));
        }
        check_axis(self.gps_latitude, self.gps_latitude_ref.as_deref(), "latitude", ["N", "S"], 90.0)?;
        check_axis(self.gps_longitude, self.gps_longitude_ref.as_deref(), "longitude", ["E", "W"], 180.0)?;
        if let Some(alt) = self.gps_altitude {
            if !(alt.is_finite() && alt >= 0.0) {
                return Err(Error::validation(format!("gps_altitude {alt} must be a non-negative number")));
            }
        }
        Ok(())
    }

    fn altitude_ref(&self) -> u8 {
        match self.gps_altitude_ref.as_deref() {
            Some(r) if r.eq_ignore_ascii_case("ABOVE_SEA_LEVEL") => 0,
            _ => 1,
        }
    }
}

fn check_axis(dms: Option<[f64; 3]>, reference: Option<&str>, name: &str, refs: [&str; 2], max: f64) -> Result<()> {
    let Some([d, m, s]) = dms else {
        return Ok(());
    };
    if !refs.iter().any(|r| Some(*r) == reference) {
        return Err(Error::validation(format!(
            "gps_{name}_ref must be {} or {}",
            refs[0], refs[1]
        )));
    }
    let parts_ok = [d, m, s].iter().all(|v| v.is_finite() && *v >= 0.0) && m < 60.0 && s < 60.0;
    if !parts_ok || d + m / 60.0 + s / 3600.0 > max {
        return Err(Error::validation(format!("gps_{name} [{d}, {m}, {s}] is not a valid {name}")));
    }
    Ok(())
}

/// Unsigned degrees, minutes and seconds of a decimal angle.
pub fn to_dms(value: f64) -> [f64; 3] {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = ((value - degrees) * 60.0).trunc();
    let seconds = ((value - degrees) * 60.0 - minutes) * 60.0;
    [degrees, minutes, seconds]
}

/// Rewrite `jpeg` so its EXIF holds `gps`.
pub fn write_gps(jpeg: &[u8], gps: &GpsFields) -> Result<Vec<u8>> {
    let fresh = gps_fields(gps);
    let kept = kept_fields(jpeg, &fresh);

    let mut fields: Vec<&Field> = kept.iter().chain(&fresh).collect();
    fields.sort_by_key(|f| f.tag.number());
    let mut writer = Writer::new();
    for f in fields {
        writer.push_field(f);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer
        .write(&mut tiff, false)
        .map_err(|e| Error::media(format!("cannot encode EXIF: {e}")))?;

    let app1 = app1_segment(tiff.get_ref())?;
    let out = replace_app1(jpeg, &app1)?;
    debug!(kept = kept.len(), before = jpeg.len(), after = out.len(), "wrote GPS EXIF");
    Ok(out)
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn rational(value: f64, denom: u32) -> Rational {
    Rational {
        num: (value * f64::from(denom)).round() as u32,
        denom,
    }
}

fn dms_rationals([d, m, s]: [f64; 3]) -> Value {
    let whole = |v: f64| if v.fract() == 0.0 { rational(v, 1) } else { rational(v, 10_000) };
    Value::Rational(vec![whole(d), whole(m), rational(s, 100)])
}

fn gps_fields(gps: &GpsFields) -> Vec<Field> {
    let mut fields = vec![field(Tag::GPSVersionID, Value::Byte(vec![2, 2, 0, 0]))];
    if let (Some(lat), Some(r)) = (gps.gps_latitude, gps.gps_latitude_ref.as_deref()) {
        fields.push(field(Tag::GPSLatitudeRef, ascii(r)));
        fields.push(field(Tag::GPSLatitude, dms_rationals(lat)));
    }
    if let (Some(lon), Some(r)) = (gps.gps_longitude, gps.gps_longitude_ref.as_deref()) {
        fields.push(field(Tag::GPSLongitudeRef, ascii(r)));
        fields.push(field(Tag::GPSLongitude, dms_rationals(lon)));
    }
    if let Some(alt) = gps.gps_altitude {
        fields.push(field(Tag::GPSAltitudeRef, Value::Byte(vec![gps.altitude_ref()])));
        fields.push(field(Tag::GPSAltitude, Value::Rational(vec![rational(alt, 100)])));
    }
    fields
}

/// Primary-image fields of the current EXIF that survive the rewrite:
/// everything except the tags in `fresh`, IFD pointers and thumbnail data,
/// which the writer lays out itself.
fn kept_fields(jpeg: &[u8], fresh: &[Field]) -> Vec<Field> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(jpeg)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Vec::new(),
        Err(e) => {
            debug!(error = %e, "existing EXIF is unreadable, replacing it");
            return Vec::new();
        }
    };
    exif.fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .filter(|f| !LAYOUT_TAGS.contains(&f.tag))
        .filter(|f| !matches!(f.value, Value::Unknown(..)))
        .filter(|f| !fresh.iter().any(|n| n.tag == f.tag))
        .map(|f| field(f.tag, f.value.clone()))
        .collect()
}

fn app1_segment(tiff: &[u8]) -> Result<Vec<u8>> {
    let len = 2 + EXIF_HEADER.len() + tiff.len();
    if len > SEGMENT_MAX {
        return Err(Error::media("EXIF block does not fit in one APP1 segment"));
    }
    let mut seg = vec![0xFF, 0xE1];
    seg.extend_from_slice(&(len as u16).to_be_bytes());
    seg.extend_from_slice(EXIF_HEADER);
    seg.extend_from_slice(tiff);
    Ok(seg)
}

/// Swap the `Exif` APP1 segment of `jpeg` for `app1`, placing it right after
/// SOI and any leading APP0 (JFIF) segments.
pub fn replace_app1(jpeg: &[u8], app1: &[u8]) -> Result<Vec<u8>> {
    if jpeg.len() < 4 || jpeg[..2] != SOI {
        return Err(Error::media("image is not a JPEG"));
    }
    let truncated = || Error::media("truncated JPEG header");

    let mut leading = Vec::new();
    let mut rest = Vec::new();
    let mut pos = 2;
    loop {
        if pos + 4 > jpeg.len() || jpeg[pos] != 0xFF {
            return Err(truncated());
        }
        let marker = jpeg[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Start of scan: the entropy-coded data follows, copy the remainder.
        if marker == 0xDA {
            break;
        }
        let len = usize::from(u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]));
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(truncated());
        }
        let segment = &jpeg[pos..end];
        let is_exif = marker == 0xE1 && segment[4..].starts_with(EXIF_HEADER);
        if !is_exif {
            if marker == 0xE0 && rest.is_empty() {
                leading.extend_from_slice(segment);
            } else {
                rest.extend_from_slice(segment);
            }
        }
        pos = end;
    }

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&SOI);
    out.extend(leading);
    out.extend_from_slice(app1);
    out.extend(rest);
    out.extend_from_slice(&jpeg[pos..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_to_dms() {
        let [d, m, s] = to_dms(-122.4194);
        assert_eq!((d, m), (122.0, 25.0));
        assert!((s - 9.84).abs() < 1e-6);
    }

    #[test]
    fn position_refs_follow_sign() {
        let gps = GpsFields::from_position(-33.9, 151.2, -4.0);
        assert_eq!(gps.gps_latitude_ref.as_deref(), Some("S"));
        assert_eq!(gps.gps_longitude_ref.as_deref(), Some("E"));
        assert_eq!(gps.gps_altitude, Some(4.0));
        assert_eq!(gps.altitude_ref(), 1);
    }

    #[test]
    fn metadata_needs_a_position() {
        assert!(GpsFields::parse("{}").is_err());
        assert!(GpsFields::parse("[1,2]").is_err());
        assert!(GpsFields::parse(r#"{"gps_latitude": [40, 26, 46.3]}"#).is_err());
        assert!(GpsFields::parse(r#"{"gps_latitude": [40, 75, 0], "gps_latitude_ref": "N"}"#).is_err());
        let ok = GpsFields::parse(r#"{"gps_altitude": 12.5, "gps_altitude_ref": "ABOVE_SEA_LEVEL"}"#).unwrap();
        assert_eq!(ok.altitude_ref(), 0);
    }

    #[test]
    fn only_requested_gps_tags_are_written() {
        let gps = GpsFields::parse(r#"{"gps_altitude": 3.25, "gps_altitude_ref": "BELOW_SEA_LEVEL"}"#).unwrap();
        let tags: Vec<Tag> = gps_fields(&gps).iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![Tag::GPSVersionID, Tag::GPSAltitudeRef, Tag::GPSAltitude]);
        let r = rational(3.25, 100);
        assert_eq!((r.num, r.denom), (325, 100));
    }

    #[test]
    fn replaces_existing_exif_segment() {
        let old_exif = [&[0xFF, 0xE1, 0x00, 0x0A][..], &b"Exif\0\0"[..], &[1, 2][..]].concat();
        let jfif = [0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB];
        let dqt = [0xFF, 0xDB, 0x00, 0x03, 0x01];
        let scan = [0xFF, 0xDA, 0x00, 0x02, 0x42, 0xFF, 0xD9];
        let jpeg = [&SOI[..], &jfif[..], &old_exif[..], &dqt[..], &scan[..]].concat();

        let new = [0xFF, 0xE1, 0x00, 0x02];
        let out = replace_app1(&jpeg, &new).unwrap();
        assert_eq!(out, [&SOI[..], &jfif[..], &new[..], &dqt[..], &scan[..]].concat());
    }

    #[test]
    fn rejects_non_jpeg() {
        assert!(replace_app1(b"\x89PNG\r\n", &[]).is_err());
    }
}
