//! # haulrate-api: Binary Entry Point
//!
//! Builds configuration from the environment, wires the live providers
//! over in-memory caches, and serves the API.

use haulrate_api::state::{AppConfig, AppState};
use haulrate_core::NegotiationConfig;
use haulrate_providers::{resolvers_from_config, ProviderConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; every request runs as the unscoped system actor");
    }

    let negotiation = NegotiationConfig::from_env().map_err(|e| {
        tracing::error!("negotiation configuration invalid: {e}");
        e
    })?;
    let providers = ProviderConfig::from_env().map_err(|e| {
        tracing::error!("provider configuration invalid: {e}");
        e
    })?;
    tracing::info!(?negotiation, ?providers, "configuration loaded");

    let (fuel, routes) = resolvers_from_config(&providers, negotiation.mpg)?;
    let state = AppState::new(config.clone(), negotiation, fuel, routes);

    let app = haulrate_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("haulrate API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
