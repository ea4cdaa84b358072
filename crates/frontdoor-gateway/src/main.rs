//! Frontdoor Gateway - authenticating reverse proxy
//!
//! This is the main entry point for the gateway service.
//!
//! # Configuration
//!
//! Settings come from environment variables, optionally seeded from a
//! dotenv file (`GATEWAY_ENV_PATH`, default `.env`). Variables already set
//! in the environment win over the file. A missing `JWT_SECRET` or a
//! malformed `PORT` stops the process before it binds a socket.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frontdoor_auth::HmacValidator;
use frontdoor_gateway::{create_router, GatewayConfig, GatewayState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load the env file before the filter reads RUST_LOG
    let env_path = std::env::var("GATEWAY_ENV_PATH").unwrap_or_else(|_| ".env".into());
    let env_file = dotenvy::from_path(&env_path);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,frontdoor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Frontdoor Gateway");

    match env_file {
        Ok(()) => tracing::info!(path = %env_path, "Loaded env file"),
        Err(e) if e.not_found() => tracing::debug!(path = %env_path, "No env file"),
        Err(e) => tracing::warn!(path = %env_path, error = %e, "Failed to read env file"),
    }

    let config = GatewayConfig::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;

    let registry = config
        .registry()
        .inspect_err(|e| tracing::error!(error = %e, "Invalid service map"))?;

    for entry in registry.entries() {
        tracing::info!(service = %entry.name, base_url = %entry.base_url, "Registered service");
    }
    if registry.is_empty() {
        tracing::warn!("Service map is empty - every proxied request will return 404");
    }

    tracing::info!(
        listen_addr = %config.listen_addr(),
        global_prefix = %config.global_prefix,
        excluded_prefixes = ?config.excluded_prefixes,
        upstream_timeout_ms = config.upstream_timeout_ms,
        cors_origins = ?config.cors_origins,
        "Gateway configuration loaded"
    );

    let jwt_validator = Arc::new(HmacValidator::new(&config.auth_config()));
    let listen_addr = config.listen_addr();
    let state = GatewayState::new(registry, jwt_validator, config)?;

    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
