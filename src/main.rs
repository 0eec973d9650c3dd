use anyhow::{Context, Result};
use clap::Parser;
use lecture_bridge::{create_router, AppState, Config, SessionOrchestrator, TranscriptStore, UploadClient};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lecture-bridge", about = "Realtime lecture transcription bridge")]
struct Args {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/lecture-bridge")]
    config: String,

    /// Override the HTTP port from the configuration file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} starting", cfg.service.name);
    info!("Transcription backend: {}", cfg.backend.base_url);

    let store = Arc::new(TranscriptStore::new());
    let orchestrator = Arc::new(SessionOrchestrator::new(
        cfg.backend.clone(),
        cfg.audio.clone(),
        Arc::clone(&store),
    ));
    let uploader = Arc::new(UploadClient::new(cfg.backend.base_url.clone()));

    let state = AppState {
        orchestrator,
        store,
        uploader,
    };

    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("HTTP control API listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}
