//! Interactive terminal viewer for a chart.
//!
//! Draws the price and RSI panels with ratatui and blocks until the user
//! presses `q`, `Esc` or `Ctrl-C`.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

use super::{close_points, date_bounds, segments, value_bounds};
use crate::indicators::{ChartSpec, OVERBOUGHT, OVERSOLD};
use crate::types::IndicatorPoint;

/// Points per dotted reference band.
const BAND_SAMPLES: usize = 80;

type Points = Vec<(f64, f64)>;

/// Owned plot data for both panels, in day offsets from the first date.
struct ViewerData {
    title: String,
    ma_label: String,
    rsi_label: String,
    x_bounds: [f64; 2],
    x_labels: Vec<String>,
    price_bounds: [f64; 2],
    close: Vec<Points>,
    moving_average: Vec<Points>,
    rsi: Vec<Points>,
    overbought: Points,
    oversold: Points,
}

impl ViewerData {
    fn from_spec(spec: &ChartSpec) -> Self {
        let (first, last) = date_bounds(spec);
        let span = (last - first).num_days() as f64;
        let offset = |points: &[IndicatorPoint]| -> Vec<Points> {
            segments(points)
                .into_iter()
                .map(|seg| {
                    seg.into_iter()
                        .map(|(d, v)| ((d - first).num_days() as f64, v))
                        .collect()
                })
                .collect()
        };

        let closes = close_points(spec);
        let (lo, hi) = value_bounds([closes.as_slice(), spec.moving_average.as_slice()]);

        let band = |level: f64| -> Points {
            (0..=BAND_SAMPLES)
                .map(|i| (span * i as f64 / BAND_SAMPLES as f64, level))
                .collect()
        };

        let mid = first + chrono::Duration::days((span / 2.0) as i64);

        Self {
            title: format!(" {} close price and moving average ", spec.series.symbol()),
            ma_label: format!("MA {}", spec.ma_window),
            rsi_label: format!("RSI {}", spec.rsi_window),
            x_bounds: [0.0, span],
            x_labels: [first, mid, last].iter().map(format_date).collect(),
            price_bounds: [lo, hi],
            close: offset(&closes),
            moving_average: offset(&spec.moving_average),
            rsi: offset(&spec.rsi),
            overbought: band(OVERBOUGHT),
            oversold: band(OVERSOLD),
        }
    }
}

fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Show `spec` in the alternate screen until dismissed. The terminal is
/// restored even when drawing fails.
pub fn show(spec: &ChartSpec) -> Result<()> {
    let data = ViewerData::from_spec(spec);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    let result = run_viewer(&mut terminal, &data);

    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to restore cursor")?;

    result
}

fn run_viewer<B: Backend>(terminal: &mut Terminal<B>, data: &ViewerData) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    loop {
        terminal.draw(|frame| draw(frame, data))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if is_dismiss(&key) {
                    return Ok(());
                }
            }
        }
    }
}

fn is_dismiss(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn draw(frame: &mut Frame, data: &ViewerData) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
            Constraint::Length(1),
        ])
        .split(frame.size());

    frame.render_widget(price_chart(data), chunks[0]);
    frame.render_widget(rsi_chart(data), chunks[1]);
    frame.render_widget(
        Paragraph::new(" q / Esc: close").style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn price_chart(data: &ViewerData) -> Chart<'_> {
    let mut datasets = line_datasets(&data.close, "Close", Color::Blue);
    datasets.extend(line_datasets(
        &data.moving_average,
        &data.ma_label,
        Color::Rgb(255, 165, 0),
    ));

    let [lo, hi] = data.price_bounds;
    Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(data.title.as_str()))
        .x_axis(date_axis(data))
        .y_axis(
            Axis::default()
                .title("Price (USD)")
                .style(Style::default().fg(Color::Gray))
                .bounds([lo, hi])
                .labels(vec![
                    Span::raw(format!("{lo:.2}")),
                    Span::raw(format!("{:.2}", (lo + hi) / 2.0)),
                    Span::raw(format!("{hi:.2}")),
                ]),
        )
}

fn rsi_chart(data: &ViewerData) -> Chart<'_> {
    let mut datasets = line_datasets(&data.rsi, &data.rsi_label, Color::Magenta);
    datasets.push(band_dataset(&data.overbought, Color::Red));
    datasets.push(band_dataset(&data.oversold, Color::Green));

    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Relative Strength Index (RSI) "),
        )
        .x_axis(date_axis(data))
        .y_axis(
            Axis::default()
                .title("RSI")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, 100.0])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw("30"),
                    Span::raw("70"),
                    Span::raw("100"),
                ]),
        )
}

fn date_axis(data: &ViewerData) -> Axis<'_> {
    Axis::default()
        .title("Date")
        .style(Style::default().fg(Color::Gray))
        .bounds(data.x_bounds)
        .labels(data.x_labels.iter().map(|l| Span::raw(l.as_str())).collect())
}

/// One dataset per contiguous segment; only the first carries the legend
/// name so the legend lists each line once.
fn line_datasets<'a>(segments: &'a [Points], name: &str, color: Color) -> Vec<Dataset<'a>> {
    let style = Style::default().fg(color);
    let mut datasets = vec![Dataset::default()
        .name(name.to_string())
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(style)
        .data(&[])];
    datasets.extend(segments.iter().map(|seg| {
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(style)
            .data(seg)
    }));
    datasets
}

fn band_dataset(points: &Points, color: Color) -> Dataset<'_> {
    Dataset::default()
        .marker(Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(color).add_modifier(Modifier::DIM))
        .data(points)
}
