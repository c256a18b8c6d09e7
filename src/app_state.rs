// =============================================================================
// Application State
// =============================================================================
//
// Shared by every HTTP handler via `Arc<AppState>`. The only mutable field is
// an atomic render counter; per-request data (series, indicators, drawing
// buffers) never lives here.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::AppConfig;
use crate::market_data::MarketDataProvider;

pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn MarketDataProvider>,

    /// Charts successfully rendered since startup.
    charts_rendered: AtomicU64,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            config,
            provider,
            charts_rendered: AtomicU64::new(0),
        }
    }

    /// Local calendar date, used as the end of every fetched range.
    pub fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    /// Count one rendered chart and return the new total.
    pub fn record_render(&self) -> u64 {
        self.charts_rendered.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn charts_rendered(&self) -> u64 {
        self.charts_rendered.load(Ordering::Relaxed)
    }
}
