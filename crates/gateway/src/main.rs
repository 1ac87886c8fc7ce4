// Promptgate gateway server

use anyhow::{Context, Result};
use promptgate_core::telemetry::{init_telemetry, TelemetryConfig};
use promptgate_gateway::{build_app, AppState, GatewayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let telemetry_config = TelemetryConfig::from_env();
    init_telemetry(&telemetry_config);

    tracing::info!(
        service = %telemetry_config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting promptgate gateway"
    );

    let config = GatewayConfig::from_env()?;
    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API routes prefixed");
    }

    let state = AppState::from_config(&config).await?;
    let app = build_app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
