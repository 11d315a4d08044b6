//! EXIF summaries of uploaded images.

use std::io::Cursor;

use exif::{Exif, In, Tag};
use image::ImageFormat;
use serde::Serialize;
use tracing::debug;
use track::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSummary {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<f64>,
    pub aperture: Option<f64>,
    pub exposure: Option<f64>,
    pub iso: Option<u32>,
    pub flash: Option<String>,
}

/// What `/read-metadata` reports about an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExifSummary {
    pub altitude: Option<f64>,
    pub latitude: Option<Vec<f64>>,
    pub longitude: Option<Vec<f64>>,
    pub latitude_ref: Option<String>,
    pub longitude_ref: Option<String>,
    pub name: String,
    pub file_size: usize,
    pub file_type: Option<String>,
    pub mime_type: String,
    pub image_size: String,
    pub color_space: Option<u32>,
    pub color_model: String,
    pub created_at: Option<String>,
    pub camera: CameraSummary,
}

/// Summarise the EXIF of `bytes`. `Ok(None)` when the image carries none.
pub fn read_summary(bytes: &[u8], name: &str) -> Result<Option<ExifSummary>> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => return Err(Error::media(format!("cannot read image metadata: {e}"))),
    };
    debug!(name, fields = exif.fields().count(), "read EXIF");

    let format = image::guess_format(bytes).ok();
    let mime_type = format
        .and_then(|f| f.extensions_str().first())
        .and_then(|ext| mime_guess::from_ext(ext).first_raw())
        .unwrap_or("image/jpeg")
        .to_string();

    let color_space = uint(&exif, Tag::ColorSpace);
    Ok(Some(ExifSummary {
        altitude: number(&exif, Tag::GPSAltitude),
        latitude: rationals(&exif, Tag::GPSLatitude),
        longitude: rationals(&exif, Tag::GPSLongitude),
        latitude_ref: ascii(&exif, Tag::GPSLatitudeRef),
        longitude_ref: ascii(&exif, Tag::GPSLongitudeRef),
        name: name.to_string(),
        file_size: bytes.len(),
        file_type: format.map(format_name),
        mime_type,
        image_size: image_size(&exif, bytes),
        color_space,
        color_model: color_model(color_space).to_string(),
        created_at: ascii(&exif, Tag::DateTimeOriginal),
        camera: CameraSummary {
            make: ascii(&exif, Tag::Make),
            model: ascii(&exif, Tag::Model),
            lens: ascii(&exif, Tag::LensModel),
            focal_length: number(&exif, Tag::FocalLength),
            aperture: number(&exif, Tag::FNumber),
            exposure: number(&exif, Tag::ExposureTime),
            iso: uint(&exif, Tag::PhotographicSensitivity),
            flash: exif
                .get_field(Tag::Flash, In::PRIMARY)
                .map(|f| f.display_value().to_string()),
        },
    }))
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".into(),
        ImageFormat::Png => "PNG".into(),
        ImageFormat::Tiff => "TIFF".into(),
        ImageFormat::WebP => "WEBP".into(),
        other => format!("{other:?}").to_uppercase(),
    }
}

fn color_model(color_space: Option<u32>) -> &'static str {
    match color_space {
        Some(1) => "sRGB",
        Some(2) => "Adobe RGB",
        Some(65535) => "Uncalibrated",
        _ => "RGB",
    }
}

/// `"W x H"` from the EXIF pixel dimensions, falling back to the image header.
fn image_size(exif: &Exif, bytes: &[u8]) -> String {
    let from_exif = uint(exif, Tag::PixelXDimension).zip(uint(exif, Tag::PixelYDimension));
    let (w, h) = from_exif
        .or_else(|| {
            image::io::Reader::new(Cursor::new(bytes))
                .with_guessed_format()
                .ok()?
                .into_dimensions()
                .ok()
        })
        .unwrap_or((0, 0));
    format!("{w} x {h}")
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        exif::Value::Ascii(parts) => {
            let text = String::from_utf8_lossy(parts.first()?);
            let text = text.trim_end_matches('\0').trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

fn rationals(exif: &Exif, tag: Tag) -> Option<Vec<f64>> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        exif::Value::Rational(v) => Some(v.iter().map(|r| r.to_f64()).collect()),
        _ => None,
    }
}

fn number(exif: &Exif, tag: Tag) -> Option<f64> {
    let value = &exif.get_field(tag, In::PRIMARY)?.value;
    match value {
        exif::Value::Rational(v) => v.first().map(|r| r.to_f64()),
        exif::Value::SRational(v) => v.first().map(|r| r.to_f64()),
        other => other.get_uint(0).map(f64::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_models() {
        assert_eq!(color_model(Some(1)), "sRGB");
        assert_eq!(color_model(Some(65535)), "Uncalibrated");
        assert_eq!(color_model(None), "RGB");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(read_summary(b"definitely not an image", "x").is_err());
    }
}
