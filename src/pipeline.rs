// =============================================================================
// Fetch + compute, shared by the CLI and HTTP shells
// =============================================================================

use anyhow::Result;
use chrono::NaiveDate;
use tracing::debug;

use crate::config::AppConfig;
use crate::indicators::{compute_indicators, ChartSpec};
use crate::market_data::{fetch_series, MarketDataProvider};

/// Fetch `[history_start, today]` for `symbol` and derive both indicators
/// with the configured windows. An unknown symbol or failed fetch yields a
/// chart over an empty series.
pub async fn build_chart_spec(
    provider: &dyn MarketDataProvider,
    config: &AppConfig,
    symbol: &str,
    today: NaiveDate,
) -> Result<ChartSpec> {
    let range = config.history_range(today)?;
    let series = fetch_series(provider, symbol, range).await;
    let spec = compute_indicators(series, config.ma_window, config.rsi_window);
    debug!(
        symbol,
        bars = spec.series.len(),
        ma_window = spec.ma_window,
        rsi_window = spec.rsi_window,
        "indicators computed"
    );
    Ok(spec)
}
