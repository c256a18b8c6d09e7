// =============================================================================
// Command-line flow
// =============================================================================
//
// prompt -> normalize -> fetch -> (no data: message, stop)
//                              -> compute -> render -> summary -> stop
//
// Generic over the input/output streams and the render target so the whole
// flow runs in tests without a terminal.
// =============================================================================

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::chart::{self, RenderTarget};
use crate::config::AppConfig;
use crate::indicators::rsi::latest_rsi;
use crate::market_data::MarketDataProvider;
use crate::pipeline::build_chart_spec;
use crate::summary::{summarize, SummaryStats};
use crate::types::normalize_symbol;

pub const PROMPT: &str = "Enter a ticker symbol (e.g. AAPL for Apple, JPM for JPMorgan): ";

/// How a CLI session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CliOutcome {
    /// Nothing was fetched; no chart was rendered.
    NoData { symbol: String },
    /// A chart was rendered and the summary printed.
    Rendered { symbol: String, stats: SummaryStats },
}

pub fn no_data_message(symbol: &str) -> String {
    format!("No data returned for ticker symbol {symbol}. Please check the ticker symbol.")
}

/// Run one prompt-to-summary session.
pub async fn run<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    provider: &dyn MarketDataProvider,
    config: &AppConfig,
    today: NaiveDate,
    target: RenderTarget,
) -> Result<CliOutcome> {
    write!(output, "{PROMPT}").context("failed to write prompt")?;
    output.flush().context("failed to flush prompt")?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read ticker symbol")?;
    let symbol = normalize_symbol(&line);

    let spec = if symbol.is_empty() {
        None
    } else {
        Some(build_chart_spec(provider, config, &symbol, today).await?)
    };

    let Some(spec) = spec.filter(|s| !s.series.is_empty()) else {
        writeln!(output, "{}", no_data_message(&symbol)).context("failed to write output")?;
        return Ok(CliOutcome::NoData { symbol });
    };

    if let Some((value, label)) = latest_rsi(&spec.rsi) {
        info!(symbol = %symbol, rsi = value, label, "latest RSI");
    }

    chart::render(&spec, target, &config.layout())?;

    let Some(stats) = summarize(&spec.series) else {
        // Unreachable: the series was checked non-empty above.
        writeln!(output, "{}", no_data_message(&symbol)).context("failed to write output")?;
        return Ok(CliOutcome::NoData { symbol });
    };
    writeln!(output, "{stats}").context("failed to write summary")?;

    Ok(CliOutcome::Rendered { symbol, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{sample_series, StaticProvider};
    use std::io::Cursor;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    async fn session(provider: &StaticProvider, typed: &str) -> (CliOutcome, String) {
        let mut input = Cursor::new(typed.as_bytes().to_vec());
        let mut output = Vec::new();
        let outcome = run(
            &mut input,
            &mut output,
            provider,
            &AppConfig::default(),
            today(),
            RenderTarget::PngBuffer,
        )
        .await
        .unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn invalid_ticker_prints_no_data() {
        let provider = StaticProvider::with(vec![sample_series("AAPL", 40)]);
        let (outcome, out) = session(&provider, "zzzinvalid\n").await;

        assert_eq!(
            outcome,
            CliOutcome::NoData {
                symbol: "ZZZINVALID".into()
            }
        );
        assert!(out.starts_with(PROMPT));
        assert!(out.contains("No data returned for ticker symbol ZZZINVALID."));
        assert!(!out.contains("Maximum close"));
    }

    #[tokio::test]
    async fn fetch_failure_prints_no_data() {
        let (outcome, out) = session(&StaticProvider::failing(), "AAPL\n").await;
        assert!(matches!(outcome, CliOutcome::NoData { .. }));
        assert!(out.contains("No data returned for ticker symbol AAPL."));
    }

    #[tokio::test]
    async fn blank_input_prints_no_data() {
        let provider = StaticProvider::with(vec![sample_series("AAPL", 40)]);
        let (outcome, _) = session(&provider, "   \n").await;
        assert_eq!(outcome, CliOutcome::NoData { symbol: String::new() });
    }

    #[tokio::test]
    async fn valid_ticker_renders_and_summarizes() {
        let series = sample_series("AAPL", 40);
        let expected = summarize(&series).unwrap();
        let provider = StaticProvider::with(vec![series]);

        let (outcome, out) = session(&provider, "aapl\n").await;

        assert_eq!(
            outcome,
            CliOutcome::Rendered {
                symbol: "AAPL".into(),
                stats: expected
            }
        );
        assert!(out.contains(&format!("Maximum close: {}", expected.max_close)));
        assert!(out.contains(&format!("Minimum close: {}", expected.min_close)));
        assert!(out.contains(&format!("Total volume: {}", expected.total_volume)));
    }
}
