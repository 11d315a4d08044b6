use clap::Parser;
use geotag_server::{app, init_logging, AppState, Config};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let config = Config::parse();

    std::fs::create_dir_all(&config.output_dir)?;
    let addr = config.addr;
    info!(
        %addr,
        output_dir = %config.output_dir.display(),
        ffmpeg = %config.ffmpeg.display(),
        "starting geotag server"
    );

    let app = app(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
