// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator functions over an already-fetched
// `PriceSeries`. Every function returns one point per input bar; undefined
// values are `None` so callers can never mistake missing history for a
// number.

pub mod rsi;
pub mod sma;

pub use rsi::{compute_rsi, DEFAULT_RSI_WINDOW, OVERBOUGHT, OVERSOLD};
pub use sma::{compute_moving_average, rolling_mean};

use serde::Serialize;

use crate::types::{IndicatorSeries, PriceSeries};

/// Moving-average window used by the CLI and HTTP shells.
pub const DEFAULT_MA_WINDOW: usize = 20;

/// One price series paired with its derived indicators, ready to render.
///
/// Built per request and dropped after the render call.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub series: PriceSeries,
    pub ma_window: usize,
    pub rsi_window: usize,
    pub moving_average: IndicatorSeries,
    pub rsi: IndicatorSeries,
}

/// Compute both indicators for `series`.
pub fn compute_indicators(series: PriceSeries, ma_window: usize, rsi_window: usize) -> ChartSpec {
    let moving_average = compute_moving_average(&series, ma_window);
    let rsi = compute_rsi(&series, rsi_window);
    ChartSpec {
        series,
        ma_window,
        rsi_window,
        moving_average,
        rsi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bar;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn indicators_share_series_dates() {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let bars = (0..40)
            .map(|i| bar(start + Duration::days(i), 100.0 + (i % 7) as f64, 1_000))
            .collect();
        let spec = compute_indicators(PriceSeries::new("MSFT", bars), 20, 14);

        assert_eq!(spec.moving_average.len(), spec.series.len());
        assert_eq!(spec.rsi.len(), spec.series.len());
        let dates = spec.series.dates();
        assert!(spec.moving_average.iter().map(|p| p.date).eq(dates.iter().copied()));
        assert!(spec.rsi.iter().map(|p| p.date).eq(dates.iter().copied()));
    }

    #[test]
    fn indicators_on_empty_series() {
        let spec = compute_indicators(PriceSeries::empty("ZZZINVALID"), 20, 14);
        assert!(spec.moving_average.is_empty());
        assert!(spec.rsi.is_empty());
    }
}
