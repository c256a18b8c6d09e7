// =============================================================================
// Yahoo Finance Chart API Client — daily OHLCV history
// =============================================================================
//
// GET {base}/{SYMBOL}?period1=..&period2=..&interval=1d
//
// Yahoo returns column-oriented arrays (timestamp[], quote[0].close[], ...)
// aligned by index. Rows with a missing open/high/low/close are skipped.
// Timestamps are shifted by the exchange `gmtoffset` so each bar lands on its
// local trading day.
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{FetchOutcome, MarketDataProvider};
use crate::types::{DateRange, PriceBar, PriceSeries};

/// Public chart endpoint.
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo rejects requests without a browser-like agent.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const SECONDS_PER_DAY: i64 = 86_400;

/// Yahoo Finance chart client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url`. `timeout` of `None` leaves requests
    /// unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid Yahoo base url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Yahoo base url '{base_url}' cannot carry a path");
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let mut builder = reqwest::Client::builder().default_headers(default_headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// Full request URL for `symbol` over `range`. `period2` is the midnight
    /// after `range.end()` so the end date is included.
    fn chart_url(&self, symbol: &str, range: DateRange) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Yahoo base url cannot carry a path"))?
            .pop_if_empty()
            .push(symbol);

        let period1 = unix_midnight(range.start());
        let period2 = unix_midnight(range.end()) + SECONDS_PER_DAY;

        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");
        Ok(url)
    }

    async fn request(&self, symbol: &str, range: DateRange) -> Result<FetchOutcome> {
        let url = self.chart_url(symbol, range)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET chart request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("failed to read chart response")?;

        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }

        let outcome = decode_chart(symbol, range, &body);
        if status.is_success() {
            return outcome;
        }

        // A non-success status can still carry a structured "Not Found" error.
        match outcome {
            Ok(FetchOutcome::NotFound) => Ok(FetchOutcome::NotFound),
            _ => anyhow::bail!("Yahoo chart returned {status}: {}", truncate(&body, 200)),
        }
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    #[instrument(skip(self), name = "yahoo::fetch")]
    async fn fetch(&self, symbol: &str, range: DateRange) -> FetchOutcome {
        match self.request(symbol, range).await {
            Ok(outcome) => {
                debug!(outcome = outcome.kind(), "chart request complete");
                outcome
            }
            Err(e) => FetchOutcome::Failed(e),
        }
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response decoding
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Decode a chart response body into an outcome. Bars outside `range` are
/// dropped.
fn decode_chart(symbol: &str, range: DateRange, body: &str) -> Result<FetchOutcome> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).context("failed to parse chart response")?;

    if let Some(err) = envelope.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Ok(FetchOutcome::NotFound);
        }
        anyhow::bail!(
            "Yahoo chart error {}: {}",
            err.code,
            err.description.unwrap_or_default()
        );
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(FetchOutcome::NotFound);
    };
    let Some(timestamps) = result.timestamp else {
        return Ok(FetchOutcome::NotFound);
    };

    let offset = result.meta.map_or(0, |m| m.gmtoffset);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive()) else {
            warn!(symbol, ts, "skipping bar with out-of-range timestamp");
            continue;
        };
        if !range.contains(date) {
            continue;
        }

        let (Some(open), Some(high), Some(low), Some(close)) = (
            cell(&quote.open, i),
            cell(&quote.high, i),
            cell(&quote.low, i),
            cell(&quote.close, i),
        ) else {
            continue;
        };
        let volume = cell(&quote.volume, i).map_or(0, |v| v.max(0.0).round() as u64);

        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    debug!(symbol, rows = timestamps.len(), bars = bars.len(), "chart decoded");
    Ok(FetchOutcome::from_series(PriceSeries::new(symbol, bars)))
}

// -----------------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------------

fn cell(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode as HttpStatus, routing::get, Router};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn january() -> DateRange {
        DateRange::new(d(2020, 1, 1), d(2020, 2, 1)).unwrap()
    }

    // 2020-01-02 14:30 UTC and 2020-01-03 14:30 UTC, offset -5h (New York).
    const AAPL_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1577975400, 1578061800, 1578321000],
                "indicators": {
                    "quote": [{
                        "open":   [74.06, 74.29, null],
                        "high":   [75.15, 75.14, 74.99],
                        "low":    [73.80, 74.13, 73.19],
                        "close":  [75.09, 74.36, 74.95],
                        "volume": [135480400, 146322800, 118387200]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    const NOT_FOUND_BODY: &str = r#"{
        "chart": {
            "result": null,
            "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
        }
    }"#;

    #[test]
    fn decode_skips_incomplete_rows() {
        let outcome = decode_chart("AAPL", january(), AAPL_BODY).unwrap();
        let FetchOutcome::Found(series) = outcome else {
            panic!("expected bars, got {}", outcome.kind());
        };
        assert_eq!(series.len(), 2);
        assert_eq!(series.dates(), vec![d(2020, 1, 2), d(2020, 1, 3)]);
        assert!((series.bars()[0].close - 75.09).abs() < 1e-9);
        assert_eq!(series.bars()[1].volume, 146_322_800);
    }

    #[test]
    fn decode_clips_to_range() {
        let range = DateRange::new(d(2020, 1, 3), d(2020, 1, 3)).unwrap();
        let FetchOutcome::Found(series) = decode_chart("AAPL", range, AAPL_BODY).unwrap() else {
            panic!("expected bars");
        };
        assert_eq!(series.dates(), vec![d(2020, 1, 3)]);
    }

    #[test]
    fn decode_not_found_error() {
        let outcome = decode_chart("ZZZINVALID", january(), NOT_FOUND_BODY).unwrap();
        assert!(matches!(outcome, FetchOutcome::NotFound));
    }

    #[test]
    fn decode_missing_timestamps_is_not_found() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(matches!(
            decode_chart("AAPL", january(), body).unwrap(),
            FetchOutcome::NotFound
        ));
    }

    #[test]
    fn decode_other_error_is_failure() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(decode_chart("AAPL", january(), body).is_err());
        assert!(decode_chart("AAPL", january(), "<html>").is_err());
    }

    #[test]
    fn chart_url_is_inclusive_and_encoded() {
        let client = YahooClient::new(DEFAULT_BASE_URL, None).unwrap();
        let url = client.chart_url("AAPL", january()).unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/AAPL");
        let slashed = client.chart_url("BRK/B", january()).unwrap();
        assert_eq!(slashed.path(), "/v8/finance/chart/BRK%2FB");
        let query = url.query().unwrap();
        assert!(query.contains("period1=1577836800"));
        // 2020-02-02 00:00 UTC
        assert!(query.contains("period2=1580601600"));
        assert!(query.contains("interval=1d"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(YahooClient::new("not a url", None).is_err());
    }

    async fn fake_upstream() -> String {
        async fn chart(Path(symbol): Path<String>) -> (HttpStatus, &'static str) {
            match symbol.as_str() {
                "AAPL" => (HttpStatus::OK, AAPL_BODY),
                "BROKEN" => (HttpStatus::INTERNAL_SERVER_ERROR, "upstream exploded"),
                _ => (HttpStatus::NOT_FOUND, NOT_FOUND_BODY),
            }
        }

        let app = Router::new().route("/chart/:symbol", get(chart));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/chart")
    }

    #[tokio::test]
    async fn fetch_against_local_upstream() {
        let base = fake_upstream().await;
        let client = YahooClient::new(&base, Some(Duration::from_secs(5))).unwrap();

        let found = client.fetch("AAPL", january()).await;
        assert!(matches!(&found, FetchOutcome::Found(s) if s.len() == 2));

        let missing = client.fetch("ZZZINVALID", january()).await;
        assert!(matches!(missing, FetchOutcome::NotFound));

        let broken = client.fetch("BROKEN", january()).await;
        assert!(matches!(broken, FetchOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = YahooClient::new("http://127.0.0.1:9/chart", None).unwrap();
        let outcome = client.fetch("AAPL", january()).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert!(outcome.into_series("AAPL").is_empty());
    }
}
