//! Cuotiji Server
//!
//! A personal mistake-notebook web service: photograph an exam question,
//! OCR it into a record, tag it with an LLM, and export selections to PDF.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;

mod config;
mod db;
mod error;
mod export;
mod imaging;
mod ocr;
mod reasoning;
mod routes;
mod state;

use config::Config;
use ocr::BaiduOcr;
use reasoning::DeepSeekClient;
use state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cuotiji_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    tracing::info!("Starting Cuotiji Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload directory: {}", config.upload.dir);
    tracing::info!("OCR app id: {}", config.ocr.app_id);

    // Make sure the upload directory exists before the first request
    tokio::fs::create_dir_all(&config.upload.dir).await?;

    // Initialize database
    let db_pool = db::create_pool(&config.database.url).await?;
    tracing::info!("Database initialized at {}", config.database.url);

    // Collaborator clients, constructed once and injected into handlers
    let ocr_client = Arc::new(BaiduOcr::new(config.ocr.clone()));
    let reasoning_client = Arc::new(DeepSeekClient::new(config.reasoning.clone()));

    let app_state = AppState::new(config.clone(), db_pool, ocr_client, reasoning_client);
    let app = routes::app(app_state);

    // Start server with graceful shutdown
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Cuotiji Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
