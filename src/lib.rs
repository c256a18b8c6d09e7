// =============================================================================
// StockScope — daily price charts with moving average and RSI
// =============================================================================

pub mod api;
pub mod app_state;
pub mod chart;
pub mod cli;
pub mod config;
pub mod indicators;
pub mod logging;
pub mod market_data;
pub mod pipeline;
pub mod summary;
pub mod types;
