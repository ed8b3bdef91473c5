//! Dual-axis temperature/humidity chart rasterized with plotters

use crate::{ReportError, ReportResult};
use chrono::{DateTime, Duration, Utc};
use meto_core::RasterImage;
use plotters::prelude::*;
use plotters::style::register_font;
use std::error::Error;
use std::ops::Range;
use std::sync::OnceLock;

pub const CHART_WIDTH: u32 = 1500;
pub const CHART_HEIGHT: u32 = 675;

pub const X_LABEL: &str = "Time";
pub const TEMPERATURE_LABEL: &str = "Temperature (°C)";
pub const HUMIDITY_LABEL: &str = "Relative Humidity (%)";

const FONT_FAMILY: &str = "sans-serif";
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const TEMPERATURE_COLOR: RGBColor = RGBColor(31, 119, 180);
const HUMIDITY_COLOR: RGBColor = RGBColor(255, 127, 14);

/// One plottable instant; either measurement may be missing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub at: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Register the bundled font once per process
fn ensure_font() -> ReportResult<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();

    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_DATA).is_ok());
    if ok {
        Ok(())
    } else {
        Err(ReportError::Font)
    }
}

/// Render temperature on the left axis and humidity on the right axis.
///
/// `fallback` is the time span used when the points do not span one
/// themselves. Missing measurements break the line instead of being drawn
/// as zero.
pub fn render_chart(
    points: &[ChartPoint],
    fallback: (DateTime<Utc>, DateTime<Utc>),
) -> ReportResult<RasterImage> {
    ensure_font()?;

    let mut rgb = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        draw(&root, points, fallback).map_err(|e| ReportError::Chart(e.to_string()))?;
        root.present()
            .map_err(|e| ReportError::Chart(e.to_string()))?;
    }

    Ok(RasterImage {
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        rgb,
    })
}

fn draw(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    points: &[ChartPoint],
    fallback: (DateTime<Utc>, DateTime<Utc>),
) -> Result<(), Box<dyn Error>> {
    root.fill(&WHITE)?;

    let span = time_span(points, fallback);
    let temperature_axis = padded(points.iter().filter_map(|p| p.temperature));
    let humidity_axis = padded(points.iter().filter_map(|p| p.humidity));
    // values the axis cannot hold would map to saturated pixel coordinates
    let temperature = runs(points, |p| p.temperature.filter(|v| temperature_axis.contains(v)));
    let humidity = runs(points, |p| p.humidity.filter(|v| humidity_axis.contains(v)));
    let has_series = !temperature.is_empty() || !humidity.is_empty();

    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .x_label_area_size(80)
        .y_label_area_size(100)
        .right_y_label_area_size(100)
        .build_cartesian_2d(span.clone(), temperature_axis)?
        .set_secondary_coord(span, humidity_axis);

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|t: &DateTime<Utc>| t.format("%m-%d %H:%M").to_string())
        .x_desc(X_LABEL)
        .y_desc(TEMPERATURE_LABEL)
        .label_style((FONT_FAMILY, 22))
        .axis_desc_style((FONT_FAMILY, 26))
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc(HUMIDITY_LABEL)
        .label_style((FONT_FAMILY, 22))
        .axis_desc_style((FONT_FAMILY, 26))
        .draw()?;

    for (i, run) in temperature.into_iter().enumerate() {
        let anno = chart.draw_series(LineSeries::new(run, TEMPERATURE_COLOR.stroke_width(2)))?;
        if i == 0 {
            anno.label(TEMPERATURE_LABEL).legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 30, y)], TEMPERATURE_COLOR.stroke_width(3))
            });
        }
    }

    for (i, run) in humidity.into_iter().enumerate() {
        let anno = chart.draw_secondary_series(DashedLineSeries::new(
            run,
            12,
            8,
            HUMIDITY_COLOR.stroke_width(2),
        ))?;
        if i == 0 {
            anno.label(HUMIDITY_LABEL).legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 30, y)], HUMIDITY_COLOR.stroke_width(3))
            });
        }
    }

    // secondary annotations live on the primary context, so one legend covers both axes
    if has_series {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT_FAMILY, 22))
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

fn time_span(
    points: &[ChartPoint],
    fallback: (DateTime<Utc>, DateTime<Utc>),
) -> Range<DateTime<Utc>> {
    let first = points.iter().map(|p| p.at).min();
    let last = points.iter().map(|p| p.at).max();

    match (first, last) {
        (Some(first), Some(last)) if first < last => first..last,
        (Some(only), Some(_)) => only - Duration::hours(1)..only + Duration::hours(1),
        _ => fallback.0..fallback.1,
    }
}

/// Split a measurement into contiguous runs of present values
fn runs(
    points: &[ChartPoint],
    value: impl Fn(&ChartPoint) -> Option<f64>,
) -> Vec<Vec<(DateTime<Utc>, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for point in points {
        match value(point) {
            Some(v) => current.push((point.at, v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Value range with a little headroom; always finite and non-empty
fn padded(values: impl Iterator<Item = f64>) -> Range<f64> {
    const FALLBACK: Range<f64> = 0.0..1.0;

    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return FALLBACK;
    }

    let range = if lo == hi {
        lo - 1.0..hi + 1.0
    } else {
        let pad = (hi - lo) * 0.05;
        lo - pad..hi + pad
    };

    if range.start.is_finite()
        && range.end.is_finite()
        && (range.end - range.start).is_finite()
        && range.start < range.end
    {
        range
    } else {
        FALLBACK
    }
}
