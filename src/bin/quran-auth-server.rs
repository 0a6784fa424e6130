//! Backend auth server: token exchange, session lookup and logout.
//!
//! Configuration comes from the environment (see [`ServerConfig::from_env`]);
//! `BIND_ADDR` defaults to `0.0.0.0:8081`, `RUST_LOG` to `info`.

use quran_auth::server::{ServerConfig, auth_routes};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    tracing::info!(
        package = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting auth server"
    );

    let config = ServerConfig::from_env()?;
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, auth_routes(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Auth server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
