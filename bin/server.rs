// Payment Predictor - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use payment_predictor::config::ServerConfig;
use payment_predictor::logging::init_logging;
use payment_predictor::{create_router, AppState};

#[derive(Parser)]
#[command(name = "prediction-server", version, about = "Payment prediction HTTP API")]
struct Cli {
    #[command(flatten)]
    server: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = Cli::parse().server;

    // Fails fast when the scoring artifact is missing
    let state = AppState::initialize(&config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, version = payment_predictor::VERSION, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
}
