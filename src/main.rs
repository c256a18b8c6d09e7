// =============================================================================
// StockScope — HTTP chart server
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use stockscope::api;
use stockscope::app_state::AppState;
use stockscope::config::AppConfig;
use stockscope::logging::{init_logging, LogOutput};
use stockscope::market_data::YahooClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();
    init_logging(LogOutput::Stdout, "info")?;

    info!("StockScope chart server starting up");

    let config = AppConfig::from_env();
    config.validate()?;
    info!(
        history_start = %config.history_start,
        ma_window = config.ma_window,
        rsi_window = config.rsi_window,
        width = config.chart_width,
        height = config.chart_height,
        "Chart settings"
    );

    // ── 2. Market data provider & shared state ───────────────────────────
    let provider = Arc::new(YahooClient::new(
        &config.yahoo_base_url,
        config.request_timeout(),
    )?);
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, provider));

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("StockScope shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
