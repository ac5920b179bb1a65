// Quorum Market - Main Entry Point
// Binary prediction markets resolved through an n-of-m quorum wallet

use std::{net::SocketAddr, sync::Arc};

use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quorum_market::{
    app_state::{AppState, SharedState},
    config::AppConfig,
    handlers::{self, ENDPOINTS},
};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quorum_market=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("═══════════════════════════════════════════════");
    tracing::info!("     🎲 Quorum Market");
    tracing::info!("═══════════════════════════════════════════════");

    let config = AppConfig::from_env()?;
    let port = config.port;
    tracing::info!(
        signers = config.signers.len(),
        threshold = ?config.threshold,
        cooldown_secs = config.cooldown_secs,
        fee_rate_bps = config.fee_rate_bps,
        "⚙️  configuration loaded"
    );

    let state: SharedState = Arc::new(Mutex::new(AppState::from_config(config)?));
    let shutdown_state = state.clone();
    let app = handlers::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 SERVER RUNNING on http://{}", addr);
    for endpoint in ENDPOINTS.iter() {
        tracing::info!("   {}", endpoint);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("💾 Saving state to disk...");
    if let Err(e) = shutdown_state.lock().await.save_to_disk() {
        tracing::error!("❌ Failed to save state: {}", e);
    }
    tracing::info!("👋 Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received...");
}
