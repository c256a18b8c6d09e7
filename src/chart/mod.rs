// =============================================================================
// Chart Rendering
// =============================================================================
//
// Two vertically stacked panels sharing the date axis:
//   1. close price + moving average
//   2. RSI with dashed reference bands at 70 / 30
//
// Every render call builds and drops its own drawing context. Nothing is kept
// between calls, so concurrent renders never share plotting state.
// =============================================================================

pub mod png;
pub mod terminal;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::ChartSpec;
use crate::types::IndicatorPoint;

/// Number of stacked panels in every chart.
pub const PANELS: usize = 2;

/// Where a chart goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderTarget {
    /// Draw in the terminal and block until the viewer is dismissed.
    Interactive,
    /// Encode as PNG into memory.
    PngBuffer,
}

/// Figure size in pixels. The default matches a 12 x 10 inch figure at
/// 100 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1000,
        }
    }
}

/// An encoded chart image.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub panels: usize,
}

#[derive(Debug)]
pub enum RenderedOutput {
    /// Shown interactively and dismissed by the user.
    Displayed,
    Png(RenderedChart),
}

/// Render `spec` to `target`.
pub fn render(spec: &ChartSpec, target: RenderTarget, layout: &ChartLayout) -> Result<RenderedOutput> {
    debug!(
        symbol = spec.series.symbol(),
        bars = spec.series.len(),
        ?target,
        "rendering chart"
    );
    match target {
        RenderTarget::Interactive => {
            terminal::show(spec)?;
            Ok(RenderedOutput::Displayed)
        }
        RenderTarget::PngBuffer => Ok(RenderedOutput::Png(png::render_png(spec, layout)?)),
    }
}

// =============================================================================
// Shared geometry helpers
// =============================================================================

/// Split a series into contiguous runs of defined, finite values. Each run is
/// drawn as its own line so undefined points show up as gaps.
pub fn segments(points: &[IndicatorPoint]) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for p in points {
        match p.value.filter(|v| v.is_finite()) {
            Some(v) => current.push((p.date, v)),
            None => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Close prices as indicator points, so price and indicators share one
/// drawing path.
pub(crate) fn close_points(spec: &ChartSpec) -> Vec<IndicatorPoint> {
    spec.series
        .bars()
        .iter()
        .map(|b| IndicatorPoint {
            date: b.date,
            value: Some(b.close),
        })
        .collect()
}

/// X-axis bounds. Always a non-empty range, even for zero or one bar.
pub(crate) fn date_bounds(spec: &ChartSpec) -> (NaiveDate, NaiveDate) {
    let fallback = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN);
    let first = spec.series.first_date().unwrap_or(fallback);
    let last = spec.series.last_date().unwrap_or(first);
    if last > first {
        (first, last)
    } else {
        (first, first + Duration::days(1))
    }
}

/// Y-axis bounds padded by 5%, with a unit range when nothing is defined.
pub(crate) fn value_bounds<'a>(series: impl IntoIterator<Item = &'a [IndicatorPoint]>) -> (f64, f64) {
    let (lo, hi) = series
        .into_iter()
        .flat_map(|s| s.iter())
        .filter_map(|p| p.value.filter(|v| v.is_finite()))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}
