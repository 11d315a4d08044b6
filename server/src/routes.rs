//! HTTP handlers. Uploads are buffered by [`Form`], validated, and the
//! blocking decode or filesystem work runs on the blocking pool.

use axum::extract::{Multipart, State};
use axum::Json;
use media::{jpeg_data_uri, load_telemetry, read_summary, write_gps, ExifFrameWriter, GpsFields};
use serde_json::{json, Value};
use tokio::task;
use tracing::info;
use track::align::{align, frame_indices, sample_frames};
use track::marker::parse_markers;
use track::{plan_path, Error, Geotagger, Method, SamplingPolicy, TimeFormat};

use crate::error::ApiError;
use crate::form::Form;
use crate::wire::PointOut;
use crate::AppState;

type ApiResult = Result<Json<Value>, ApiError>;

pub async fn read_metadata(multipart: Multipart) -> ApiResult {
    let form = Form::collect(multipart).await?;
    let image = form.file("image")?.clone();

    let summary = task::spawn_blocking(move || read_summary(&image.bytes, &image.file_name)).await??;
    Ok(Json(match summary {
        Some(exif) => json!({ "exif_data": exif }),
        None => json!({ "message": "No EXIF metadata found" }),
    }))
}

pub async fn write_metadata(multipart: Multipart) -> ApiResult {
    let form = Form::collect(multipart).await?;
    let image = form.file("image")?.clone();
    let metadata = form
        .text("metadata")
        .ok_or_else(|| ApiError::bad_request("metadata is required"))?;
    let gps = GpsFields::parse(metadata)?;

    let applied = gps.clone();
    let tagged = task::spawn_blocking(move || write_gps(&image.bytes, &gps)).await??;
    info!(bytes = tagged.len(), "rewrote image EXIF");
    Ok(Json(json!({
        "exif_data": applied,
        "image": jpeg_data_uri(&tagged),
    })))
}

pub async fn split_video(State(state): State<AppState>, multipart: Multipart) -> ApiResult {
    let form = Form::collect(multipart).await?;
    let video = form.file("video")?.bytes.clone();
    let max_frames: usize = form.parse_or("max_frames", 30)?;
    let frame_interval: u64 = form.parse_or("frame_interval", 1)?;
    if max_frames == 0 {
        return Err(ApiError::bad_request("max_frames must be positive"));
    }

    let opener = state.videos.clone();
    let width = state.config.preview_width;
    let (metadata, frames) = task::spawn_blocking(move || -> track::Result<_> {
        let mut source = opener.open(&video, Some(width))?;
        let indices = frame_indices(source.info().frame_count, max_frames, frame_interval);
        let frames = sample_frames(source.as_mut(), &indices);
        Ok((source.info().clone(), frames))
    })
    .await??;

    if frames.is_empty() {
        return Err(ApiError::bad_request("Failed to extract frames from video"));
    }
    let encoded: Vec<String> = frames.iter().map(|(_, f)| jpeg_data_uri(f)).collect();
    Ok(Json(json!({
        "metadata": metadata,
        "frame_count": encoded.len(),
        "frames": encoded,
    })))
}

/// Interpolation defaults of one endpoint revision.
#[derive(Debug, Clone, Copy)]
struct PathDefaults {
    method: Method,
    format: TimeFormat,
}

pub async fn interpolate_path(State(state): State<AppState>, multipart: Multipart) -> ApiResult {
    let defaults = PathDefaults { method: Method::Linear, format: TimeFormat::Seconds };
    interpolate_with(state, multipart, defaults).await
}

pub async fn interpolate_path_v2(State(state): State<AppState>, multipart: Multipart) -> ApiResult {
    let defaults = PathDefaults { method: Method::Cubic, format: TimeFormat::Mmss };
    interpolate_with(state, multipart, defaults).await
}

async fn interpolate_with(state: AppState, multipart: Multipart, defaults: PathDefaults) -> ApiResult {
    let form = Form::collect(multipart).await?;
    let video = form.file("video")?.bytes.clone();
    let interval = form.positive_seconds("frames_interval", 1.0)?;
    let markers = form
        .text("markers")
        .or_else(|| form.text("timestamp"))
        .ok_or_else(|| ApiError::bad_request("markers are required"))?;
    let format = match form.text("time_format") {
        Some(name) => TimeFormat::from_name(name)?,
        None => defaults.format,
    };
    let method = match form.text("method") {
        Some(name) => Method::from_name(name)?,
        None => defaults.method,
    };

    // Everything about the markers is checked before the video is touched.
    let plan = plan_path(&parse_markers(markers)?, format, interval, method)?;

    let opener = state.videos.clone();
    let width = state.config.preview_width;
    let max_seconds = state.config.max_video_seconds;
    let (metadata, plan, aligned) = task::spawn_blocking(move || -> track::Result<_> {
        let mut source = opener.open(&video, Some(width))?;
        let metadata = source.info().clone();
        if metadata.duration > max_seconds {
            return Err(Error::validation(format!(
                "Video duration {:.1}s exceeds the {max_seconds}s limit",
                metadata.duration
            )));
        }
        let aligned = align(&plan.frame_times(), source.as_mut(), |i, _| plan.samples[i]);
        Ok((metadata, plan, aligned))
    })
    .await??;

    info!(
        samples = plan.samples.len(),
        aligned = aligned.len(),
        ?method,
        "interpolated path"
    );
    let points: Vec<PointOut> = aligned
        .iter()
        .map(|a| PointOut::new(&a.location, plan.format, Some(jpeg_data_uri(&a.frame))))
        .collect();
    Ok(Json(json!({
        "metadata": metadata,
        "path_stats": plan.stats,
        "points": points,
    })))
}

pub async fn geotag_video(State(state): State<AppState>, multipart: Multipart) -> ApiResult {
    let form = Form::collect(multipart).await?;
    geotag_with(state, form, SamplingPolicy::AllTimestamps).await
}

pub async fn geotag_video_interval(State(state): State<AppState>, multipart: Multipart) -> ApiResult {
    let form = Form::collect(multipart).await?;
    let interval = form.positive_seconds("frame_interval", 1.0)?;
    geotag_with(state, form, SamplingPolicy::FixedInterval(interval)).await
}

async fn geotag_with(state: AppState, form: Form, policy: SamplingPolicy) -> ApiResult {
    let video = form.file("video")?.bytes.clone();
    let csv = form.file("csv")?.bytes.clone();

    let opener = state.videos.clone();
    let sink = ExifFrameWriter::new(state.config.output_dir.clone());
    let saved = task::spawn_blocking(move || -> track::Result<_> {
        let mut tagger = Geotagger::new(policy, sink)?;
        tagger.load_telemetry(|| load_telemetry(&csv[..]))?;
        tagger.load_video(|| opener.open(&video, None))?;
        tagger.process()
    })
    .await??;

    info!(?policy, saved = saved.len(), "geotagged video");
    Ok(Json(json!({
        "status": "success",
        "saved_frames": saved,
    })))
}
