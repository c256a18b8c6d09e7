pub mod yahoo;

pub use yahoo::YahooClient;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::types::{DateRange, PriceSeries};

// ---------------------------------------------------------------------------
// Fetch outcome
// ---------------------------------------------------------------------------

/// Result of a single market-data fetch.
///
/// `Found` always carries at least one bar. Shells that only care about
/// "data or no data" collapse the outcome with [`FetchOutcome::into_series`].
#[derive(Debug)]
pub enum FetchOutcome {
    Found(PriceSeries),
    NotFound,
    Failed(anyhow::Error),
}

impl FetchOutcome {
    /// Wrap a possibly-empty series, mapping emptiness to `NotFound`.
    pub fn from_series(series: PriceSeries) -> Self {
        if series.is_empty() {
            Self::NotFound
        } else {
            Self::Found(series)
        }
    }

    /// Collapse to a series that is empty for both `NotFound` and `Failed`.
    pub fn into_series(self, symbol: &str) -> PriceSeries {
        match self {
            Self::Found(series) => series,
            Self::NotFound | Self::Failed(_) => PriceSeries::empty(symbol),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::Failed(_) => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// A source of daily OHLCV history.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch daily bars for `symbol` over the inclusive `range`.
    async fn fetch(&self, symbol: &str, range: DateRange) -> FetchOutcome;
}

/// Fetch and collapse to a plain series, logging why it came back empty.
pub async fn fetch_series(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    range: DateRange,
) -> PriceSeries {
    let outcome = provider.fetch(symbol, range).await;
    match &outcome {
        FetchOutcome::Found(series) => {
            info!(symbol, range = %range, bars = series.len(), "price series fetched");
        }
        FetchOutcome::NotFound => {
            info!(symbol, range = %range, "no price data for symbol");
        }
        FetchOutcome::Failed(e) => {
            warn!(symbol, range = %range, error = %format!("{e:#}"), "price fetch failed");
        }
    }
    outcome.into_series(symbol)
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// In-memory provider returning canned series by symbol.
#[cfg(test)]
pub(crate) struct StaticProvider {
    pub series: std::collections::HashMap<String, PriceSeries>,
    pub fail: bool,
}

#[cfg(test)]
impl StaticProvider {
    pub fn with(series: Vec<PriceSeries>) -> Self {
        Self {
            series: series
                .into_iter()
                .map(|s| (s.symbol().to_string(), s))
                .collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            series: std::collections::HashMap::new(),
            fail: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn fetch(&self, symbol: &str, range: DateRange) -> FetchOutcome {
        if self.fail {
            return FetchOutcome::Failed(anyhow::anyhow!("connection refused"));
        }
        match self.series.get(symbol) {
            Some(series) => {
                let bars = series
                    .bars()
                    .iter()
                    .copied()
                    .filter(|b| range.contains(b.date))
                    .collect();
                FetchOutcome::from_series(PriceSeries::new(symbol, bars))
            }
            None => FetchOutcome::NotFound,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_series(symbol: &str, days: i64) -> PriceSeries {
    use chrono::{Duration, NaiveDate};

    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let bars = (0..days)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1;
            crate::types::bar(start + Duration::days(i), close, 1_000 + i as u64)
        })
        .collect();
    PriceSeries::new(symbol, bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn outcome_collapses_to_empty() {
        assert!(FetchOutcome::NotFound.into_series("X").is_empty());
        let failed = FetchOutcome::Failed(anyhow::anyhow!("boom"));
        assert_eq!(failed.kind(), "failed");
        assert!(failed.into_series("X").is_empty());
    }

    #[test]
    fn from_series_maps_empty_to_not_found() {
        assert!(matches!(
            FetchOutcome::from_series(PriceSeries::empty("X")),
            FetchOutcome::NotFound
        ));
        assert!(matches!(
            FetchOutcome::from_series(sample_series("X", 3)),
            FetchOutcome::Found(_)
        ));
    }

    #[tokio::test]
    async fn unknown_symbol_yields_empty_series() {
        let provider = StaticProvider::with(vec![sample_series("AAPL", 40)]);
        let series = fetch_series(&provider, "ZZZINVALID", range()).await;
        assert!(series.is_empty());
        assert_eq!(series.symbol(), "ZZZINVALID");
    }

    #[tokio::test]
    async fn failure_is_indistinguishable_from_no_data() {
        let series = fetch_series(&StaticProvider::failing(), "AAPL", range()).await;
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn known_symbol_is_clipped_to_range() {
        let provider = StaticProvider::with(vec![sample_series("AAPL", 60)]);
        let series = fetch_series(&provider, "AAPL", range()).await;
        assert_eq!(series.len(), 32);
        assert!(series.bars().iter().all(|b| range().contains(b.date)));
    }
}
