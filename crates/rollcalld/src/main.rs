use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod routes;
mod state;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::from_env();

    let store = rollcall_store::SqliteStore::open(&config.db_path)?;

    let mut encoder = rollcall_core::OnnxEncoder::load(
        &config.detector_model_path(),
        &config.embedder_model_path(),
    )?;

    let gallery = rollcall_core::Gallery::build(&config.faces_dir, &mut encoder);
    if gallery.is_empty() {
        tracing::warn!(
            dir = %config.faces_dir.display(),
            "no known faces loaded; every probe will come back Unknown"
        );
    }

    let state = Arc::new(state::AppState::new(
        encoder,
        gallery,
        store,
        config.threshold,
    ));

    let app = routes::create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "rollcalld ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("rollcalld shutting down");
        })
        .await?;

    Ok(())
}
