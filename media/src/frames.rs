use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::debug;
use track::{FrameSink, Result, TelemetryRecord};

use crate::exif_write::{write_gps, GpsFields};

/// Persists geotagged frames as `<root>/YYYY-MM-DD/frame_YYYYMMDD_HHMMSS_ffffff.jpg`.
#[derive(Debug, Clone)]
pub struct ExifFrameWriter {
    root: PathBuf,
}

impl ExifFrameWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where a frame captured at `at` is written.
    pub fn path_for(&self, at: DateTime<Utc>) -> PathBuf {
        self.root
            .join(at.format("%Y-%m-%d").to_string())
            .join(at.format("frame_%Y%m%d_%H%M%S_%6f.jpg").to_string())
    }
}

impl FrameSink for ExifFrameWriter {
    fn persist(&mut self, frame: &[u8], telemetry: &TelemetryRecord, at: DateTime<Utc>) -> Result<PathBuf> {
        let gps = GpsFields::from_position(telemetry.latitude, telemetry.longitude, telemetry.altitude);
        let tagged = write_gps(frame, &gps)?;
        let path = self.path_for(at);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, tagged)?;
        debug!(path = %path.display(), "saved geotagged frame");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn date_partitioned_names() {
        let at = DateTime::parse_from_rfc3339("2024-03-09T07:05:03.250Z").unwrap().with_timezone(&Utc);
        let writer = ExifFrameWriter::new("drone_frames");
        assert_eq!(
            writer.path_for(at),
            Path::new("drone_frames/2024-03-09/frame_20240309_070503_250000.jpg")
        );
    }
}
