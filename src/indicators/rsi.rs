// =============================================================================
// Relative Strength Index (RSI) — Simple Rolling Mean
// =============================================================================
//
// Step 1 — delta[i] = close[i] - close[i-1]; delta[0] is undefined.
// Step 2 — gain[i] = max(delta, 0), loss[i] = max(-delta, 0); undefined where
//          delta is undefined.
// Step 3 — avg_gain / avg_loss = rolling mean of gain / loss over `window`
//          entries (undefined until `window` deltas exist, i.e. i < window).
// Step 4 — RS  = avg_gain / avg_loss   (IEEE division, no zero guard)
//          RSI = 100 - 100 / (1 + RS)
//
// Division edge cases:
//   avg_loss == 0, avg_gain > 0  => RS = +inf => RSI = 100
//   avg_loss == 0, avg_gain == 0 => RS = NaN  => RSI undefined
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use crate::indicators::sma::rolling_mean;
use crate::types::{IndicatorPoint, IndicatorSeries, PriceSeries};

/// Window used by every shell unless configured otherwise.
pub const DEFAULT_RSI_WINDOW: usize = 14;

/// Upper reference band drawn on the RSI panel.
pub const OVERBOUGHT: f64 = 70.0;
/// Lower reference band drawn on the RSI panel.
pub const OVERSOLD: f64 = 30.0;

/// Compute the RSI series for `series`, one point per bar.
///
/// The first defined value is at index `window`. A flat window (no gains and
/// no losses) stays undefined rather than being mapped to a neutral value.
pub fn compute_rsi(series: &PriceSeries, window: usize) -> IndicatorSeries {
    let closes = series.closes();

    let deltas: Vec<Option<f64>> = std::iter::once(None)
        .chain(closes.windows(2).map(|w| Some(w[1] - w[0])))
        .take(closes.len())
        .collect();

    let gains: Vec<Option<f64>> = deltas
        .iter()
        .map(|d| d.map(|d| if d > 0.0 { d } else { 0.0 }))
        .collect();
    let losses: Vec<Option<f64>> = deltas
        .iter()
        .map(|d| d.map(|d| if d < 0.0 { -d } else { 0.0 }))
        .collect();

    let avg_gain = rolling_mean(&gains, window);
    let avg_loss = rolling_mean(&losses, window);

    series
        .bars()
        .iter()
        .zip(avg_gain.into_iter().zip(avg_loss))
        .map(|(bar, (g, l))| IndicatorPoint {
            date: bar.date,
            value: match (g, l) {
                (Some(g), Some(l)) => rsi_from_averages(g, l),
                _ => None,
            },
        })
        .collect()
}

/// Classify an RSI reading against the fixed reference bands.
pub fn rsi_label(value: f64) -> &'static str {
    if value >= OVERBOUGHT {
        "OVERBOUGHT"
    } else if value <= OVERSOLD {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}

/// The most recent defined RSI value with its label.
pub fn latest_rsi(rsi: &[IndicatorPoint]) -> Option<(f64, &'static str)> {
    let value = rsi.iter().rev().find_map(|p| p.value)?;
    Some((value, rsi_label(value)))
}

// =============================================================================
// Internal helpers
// =============================================================================

/// 0/0 yields NaN, reported as undefined; x/0 yields +inf, giving exactly 100.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);
    if rsi.is_nan() {
        None
    } else {
        Some(rsi)
    }
}
