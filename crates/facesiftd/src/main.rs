use anyhow::{Context, Result};
use facesift_core::{Embedder, Matcher, OnnxEmbedder, ARCFACE_MATCH_DISTANCE};
use facesift_photos::PhotoFolder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod error;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("facesiftd starting");

    let config = config::Config::from_env()?;

    let photos = PhotoFolder::new(&config.photo_dir);
    photos
        .ensure_exists()
        .with_context(|| format!("creating photo folder {}", config.photo_dir.display()))?;

    // Load models synchronously (fail-fast)
    let embedder = OnnxEmbedder::from_dir(&config.model_dir)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;
    tracing::info!(model_dir = %config.model_dir.display(), "face models loaded");
    if config.default_threshold_too_strict(embedder.model_version()) {
        tracing::warn!(
            threshold = config.distance_threshold,
            suggested = ARCFACE_MATCH_DISTANCE,
            model = embedder.model_version().unwrap_or_default(),
            "default distance threshold only matches near-duplicate faces with this model; \
             set FACESIFT_DISTANCE_THRESHOLD"
        );
    }

    let matcher = Matcher::new(Arc::new(embedder)).with_threshold(config.distance_threshold);
    let engine = engine::Engine::new(matcher, photos);
    let app = routes::router(engine, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    tracing::info!(
        addr = %config.bind,
        photo_dir = %config.photo_dir.display(),
        threshold = config.distance_threshold,
        "facesiftd ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("facesiftd shutting down");
    Ok(())
}
