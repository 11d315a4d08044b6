//! Codec and file-format collaborators for the `track` pipeline.
//!
//! Everything that shells out, parses container formats, or touches disk
//! lives here, behind the traits `track` defines.

pub mod encode;
pub mod exif_read;
pub mod exif_write;
pub mod ffmpeg;
pub mod frames;
pub mod telemetry_csv;

pub use encode::{data_uri, jpeg_data_uri};
pub use exif_read::{read_summary, ExifSummary};
pub use exif_write::{write_gps, GpsFields};
pub use ffmpeg::Ffmpeg;
pub use frames::ExifFrameWriter;
pub use telemetry_csv::load_telemetry;
