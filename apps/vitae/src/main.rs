mod config;
mod errors;
mod models;
mod preview;
mod routes;
mod state;
mod themes;
mod transfer;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::transfer::HttpTransferClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Vitae v{}", env!("CARGO_PKG_VERSION"));

    // Initialize collaborator client
    let transfer = HttpTransferClient::new(
        &config.parse_service_url,
        &config.render_service_url,
        config.transfer_timeout,
    )
    .context("Failed to build HTTP client")?;
    info!(
        "Collaborators: parser={} renderer={} timeout={:?}",
        config.parse_service_url, config.render_service_url, config.transfer_timeout
    );

    let state = AppState::new(config.clone(), Arc::new(transfer));

    // Evict abandoned sessions
    state.sessions.spawn_expiry(config.session_ttl);
    info!("Session TTL: {:?}", config.session_ttl);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
