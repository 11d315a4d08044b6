//! HTTP surface of the geotagging service.
//!
//! ```no_run
//! use geotag_server::{app, AppState, Config};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let listener = tokio::net::TcpListener::bind(config.addr).await?;
//! axum::serve(listener, app(AppState::new(config))).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod routes;
pub mod wire;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::post;
use axum::Router;
use media::Ffmpeg;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use track::VideoOpener;

pub use config::Config;
pub use error::ApiError;
pub use logging::init_logging;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub videos: Arc<dyn VideoOpener>,
}

impl AppState {
    /// Decode videos with the configured ffmpeg binaries.
    pub fn new(config: Config) -> Self {
        let videos = Arc::new(Ffmpeg::new(config.ffmpeg.clone(), config.ffprobe.clone()));
        Self::with_opener(config, videos)
    }

    pub fn with_opener(config: Config, videos: Arc<dyn VideoOpener>) -> Self {
        Self {
            config: Arc::new(config),
            videos,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/read-metadata", post(routes::read_metadata))
        .route("/write-metadata", post(routes::write_metadata))
        .route("/split-video", post(routes::split_video))
        .route("/interpolate-path", post(routes::interpolate_path))
        .route("/interpolate-path-v2", post(routes::interpolate_path_v2))
        .route("/geotagger-video", post(routes::geotag_video))
        .route("/geotagger-video-interval", post(routes::geotag_video_interval))
        .nest_service("/drone_frames", ServeDir::new(&state.config.output_dir))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes()))
        .layer(cors)
        .with_state(state)
}
