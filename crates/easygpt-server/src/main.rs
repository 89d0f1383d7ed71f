// Binary entry point for easygpt-server

mod api;
mod args;
mod constants;
mod error;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use easygpt_core::{InteractionJournal, ProviderKind, ProviderRouter, Settings};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    run(args).await
}

/// Load settings, build the provider clients and serve until shutdown.
async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;
    let router =
        ProviderRouter::from_settings(&settings).context("building provider clients")?;
    let journal = InteractionJournal::new(&settings.logging);

    let configured: Vec<&str> = ProviderKind::remote()
        .filter(|kind| settings.credentials.api_key(*kind).is_some())
        .map(|kind| kind.as_str())
        .collect();

    info!("Starting EasyGPT backend");
    info!(
        "  Default provider: {}",
        settings.models.default_provider()
    );
    info!("  Providers with keys: {}", configured.join(", "));
    info!(
        "  Journal: {}",
        if journal.is_enabled() {
            journal.path().display().to_string()
        } else {
            "disabled".to_string()
        }
    );

    let state = Arc::new(api::AppState::new(router, journal));
    let app = api::app(state, &args.allowed_origins());

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("  Listening on: {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
