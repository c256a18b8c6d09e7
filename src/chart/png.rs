// =============================================================================
// PNG Chart Backend — plotters bitmap into an owned buffer
// =============================================================================

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use plotters::coord::CoordTranslate;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{close_points, date_bounds, segments, value_bounds, RenderedChart, PANELS};
use crate::indicators::{ChartSpec, OVERBOUGHT, OVERSOLD};
use crate::types::IndicatorPoint;

const CLOSE_COLOR: RGBColor = RGBColor(0, 0, 255);
const MA_COLOR: RGBColor = RGBColor(255, 165, 0);
const RSI_COLOR: RGBColor = RGBColor(128, 0, 128);
const OVERBOUGHT_COLOR: RGBColor = RGBColor(255, 0, 0);
const OVERSOLD_COLOR: RGBColor = RGBColor(0, 128, 0);

const FONT: &str = "sans-serif";

/// Draw `spec` into a fresh RGB buffer and encode it as PNG.
pub fn render_png(spec: &ChartSpec, layout: &super::ChartLayout) -> Result<RenderedChart> {
    let (width, height) = (layout.width, layout.height);
    if width == 0 || height == 0 {
        anyhow::bail!("chart dimensions must be non-zero, got {width}x{height}");
    }

    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let panels = root.split_evenly((PANELS, 1));
        draw_price_panel(&panels[0], spec)?;
        draw_rsi_panel(&panels[1], spec)?;

        root.present().map_err(draw_err)?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&pixels, width, height, ColorType::Rgb8)
        .context("PNG encoding failed")?;

    Ok(RenderedChart {
        png,
        width,
        height,
        panels: PANELS,
    })
}

fn draw_price_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
) -> Result<()> {
    let closes = close_points(spec);
    let (x0, x1) = date_bounds(spec);
    let (y0, y1) = value_bounds([closes.as_slice(), spec.moving_average.as_slice()]);

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("{} close price and moving average", spec.series.symbol()),
            (FONT, 22),
        )
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Price (USD)")
        .x_labels(8)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
        .draw()
        .map_err(draw_err)?;

    draw_line(&mut chart, &closes, CLOSE_COLOR, "Close".to_string())?;
    draw_line(
        &mut chart,
        &spec.moving_average,
        MA_COLOR,
        format!("{}-day moving average", spec.ma_window),
    )?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

fn draw_rsi_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
) -> Result<()> {
    let (x0, x1) = date_bounds(spec);

    let mut chart = ChartBuilder::on(area)
        .caption("Relative Strength Index (RSI)", (FONT, 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, 0.0..100.0)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("RSI")
        .x_labels(8)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
        .draw()
        .map_err(draw_err)?;

    draw_line(
        &mut chart,
        &spec.rsi,
        RSI_COLOR,
        format!("RSI ({})", spec.rsi_window),
    )?;

    for (level, color) in [(OVERBOUGHT, OVERBOUGHT_COLOR), (OVERSOLD, OVERSOLD_COLOR)] {
        chart
            .draw_series(DashedLineSeries::new(
                vec![(x0, level), (x1, level)],
                10,
                6,
                color.mix(0.5).stroke_width(2),
            ))
            .map_err(draw_err)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

/// Draw one labelled line, broken into segments wherever values are
/// undefined. The legend entry is registered even when nothing is defined.
fn draw_line<DB, CT>(
    chart: &mut ChartContext<'_, DB, CT>,
    points: &[IndicatorPoint],
    color: RGBColor,
    label: String,
) -> Result<()>
where
    DB: DrawingBackend,
    CT: CoordTranslate<From = (NaiveDate, f64)>,
{
    let style = color.stroke_width(2);

    chart
        .draw_series(LineSeries::new(Vec::<(NaiveDate, f64)>::new(), style))
        .map_err(draw_err)?
        .label(label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));

    for segment in segments(points) {
        chart
            .draw_series(LineSeries::new(segment, style))
            .map_err(draw_err)?;
    }
    Ok(())
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("chart drawing failed: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartLayout;
    use crate::indicators::compute_indicators;
    use crate::market_data::sample_series;
    use crate::types::PriceSeries;
    use image::{GenericImageView, Rgb};

    fn has_color(img: &image::RgbImage, rows: std::ops::Range<u32>, color: RGBColor) -> bool {
        let target = Rgb([color.0, color.1, color.2]);
        rows.into_iter()
            .any(|y| (0..img.width()).any(|x| *img.get_pixel(x, y) == target))
    }

    #[test]
    fn png_round_trip_has_two_panels() {
        let spec = compute_indicators(sample_series("AAPL", 120), 20, 14);
        let layout = ChartLayout::default();
        let chart = render_png(&spec, &layout).unwrap();

        assert_eq!(chart.panels, 2);
        assert_eq!(&chart.png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&chart.png).unwrap();
        assert_eq!(decoded.dimensions(), (1200, 1000));

        let rgb = decoded.to_rgb8();
        let half = rgb.height() / 2;
        assert!(has_color(&rgb, 0..half, CLOSE_COLOR), "price panel missing close line");
        assert!(has_color(&rgb, half..rgb.height(), RSI_COLOR), "RSI panel missing RSI line");
        assert!(!has_color(&rgb, half..rgb.height(), CLOSE_COLOR));
    }

    #[test]
    fn png_respects_configured_size() {
        let spec = compute_indicators(sample_series("AAPL", 40), 20, 14);
        let layout = ChartLayout {
            width: 640,
            height: 480,
        };
        let chart = render_png(&spec, &layout).unwrap();
        let decoded = image::load_from_memory(&chart.png).unwrap();
        assert_eq!(decoded.dimensions(), (640, 480));
    }

    #[test]
    fn empty_series_renders_degenerate_chart() {
        let spec = compute_indicators(PriceSeries::empty("ZZZINVALID"), 20, 14);
        let chart = render_png(&spec, &ChartLayout::default()).unwrap();
        let decoded = image::load_from_memory(&chart.png).unwrap();
        assert_eq!(decoded.dimensions(), (1200, 1000));
    }

    #[test]
    fn flat_series_renders_without_rsi() {
        let bars = sample_series("FLAT", 30)
            .bars()
            .iter()
            .map(|b| crate::types::PriceBar { close: 50.0, ..*b })
            .collect();
        let spec = compute_indicators(PriceSeries::new("FLAT", bars), 20, 14);
        assert!(spec.rsi.iter().all(|p| p.value.is_none()));
        assert!(render_png(&spec, &ChartLayout::default()).is_ok());
    }

    #[test]
    fn zero_size_is_rejected() {
        let spec = compute_indicators(sample_series("AAPL", 5), 20, 14);
        let layout = ChartLayout {
            width: 0,
            height: 100,
        };
        assert!(render_png(&spec, &layout).is_err());
    }

    #[test]
    fn repeated_renders_are_identical() {
        let spec = compute_indicators(sample_series("AAPL", 60), 20, 14);
        let layout = ChartLayout::default();
        let a = render_png(&spec, &layout).unwrap();
        let b = render_png(&spec, &layout).unwrap();
        assert_eq!(a.png, b.png);
    }
}
