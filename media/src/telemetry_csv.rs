//! Drone flight logs exported as CSV.

use std::io::Read;

use serde::Deserialize;
use tracing::info;
use track::time::parse_datetime;
use track::{Error, Result, TelemetryRecord, TelemetryTable};

const FEET_TO_METERS: f64 = 0.3048;
const MPH_TO_METERS_PER_SECOND: f64 = 0.447_04;

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "datetime(utc)")]
    datetime: String,
    latitude: f64,
    longitude: f64,
    #[serde(rename = "altitude(feet)")]
    altitude_feet: f64,
    #[serde(rename = "height_above_takeoff(feet)", default)]
    height_above_takeoff_feet: Option<f64>,
    #[serde(rename = "speed(mph)", default)]
    speed_mph: Option<f64>,
    #[serde(rename = "compass_heading(degrees)", default)]
    compass_heading: Option<f64>,
}

impl Row {
    fn into_record(self) -> Result<TelemetryRecord> {
        let time = parse_datetime(&self.datetime)?;
        let mut record = TelemetryRecord::new(
            time,
            self.latitude,
            self.longitude,
            self.altitude_feet * FEET_TO_METERS,
        );
        record.height_above_takeoff = self.height_above_takeoff_feet.map(|h| h * FEET_TO_METERS);
        record.speed = self.speed_mph.map(|s| s * MPH_TO_METERS_PER_SECOND);
        record.compass_heading = self.compass_heading;
        Ok(record)
    }
}

/// Read a flight log. Column names are matched after trimming; extra
/// columns are ignored.
pub fn load_telemetry<R: Read>(input: R) -> Result<TelemetryTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<Row>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = row.map_err(|e| Error::validation(format!("telemetry line {line}: {e}")))?;
        let record = row
            .into_record()
            .map_err(|e| Error::validation(format!("telemetry line {line}: {e}")))?;
        records.push(record);
    }
    info!(rows = records.len(), "loaded telemetry csv");
    Ok(TelemetryTable::new(records))
}
