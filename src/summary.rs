// =============================================================================
// Summary statistics over a fetched series
// =============================================================================

use serde::Serialize;

use crate::types::PriceSeries;

/// Aggregate figures shown after the chart on the CLI path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub max_close: f64,
    pub min_close: f64,
    pub total_volume: u64,
}

/// Max/min close and total volume. `None` for an empty series.
pub fn summarize(series: &PriceSeries) -> Option<SummaryStats> {
    let first = series.bars().first()?;
    let init = SummaryStats {
        max_close: first.close,
        min_close: first.close,
        total_volume: 0,
    };

    Some(series.bars().iter().fold(init, |acc, bar| SummaryStats {
        max_close: acc.max_close.max(bar.close),
        min_close: acc.min_close.min(bar.close),
        total_volume: acc.total_volume.saturating_add(bar.volume),
    }))
}

impl std::fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Maximum close: {}", self.max_close)?;
        writeln!(f, "Minimum close: {}", self.min_close)?;
        write!(f, "Total volume: {}", self.total_volume)
    }
}
