//! Document report: an empty notice or a charted summary of one window

use crate::chart::{render_chart, ChartPoint};
use crate::ReportResult;
use chrono::{DateTime, Utc};
use meto_core::{DocumentPayload, Location, RasterImage, Window};
use tracing::{debug, warn};

pub const REPORT_TITLE: &str = "Weather Report";

/// The two shapes a document report can take
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Empty(EmptyReport),
    Charted(ChartedReport),
}

/// Report for a window without observations: title and notice only
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyReport {
    pub title: String,
    pub notice: String,
}

/// Report with location, requested date range and a dual-axis chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartedReport {
    pub title: String,
    pub location: Option<Location>,

    /// Requested window bounds, not the span of the data found
    pub range: (DateTime<Utc>, DateTime<Utc>),

    pub points: Vec<ChartPoint>,

    /// Observations dropped because their timestamp did not parse
    pub skipped: usize,
}

impl Report {
    pub fn build(window: &Window) -> Self {
        if window.is_empty() {
            return Report::Empty(EmptyReport::new(window.hours));
        }
        Report::Charted(ChartedReport::from_window(window))
    }

    pub fn title(&self) -> &str {
        match self {
            Report::Empty(report) => &report.title,
            Report::Charted(report) => &report.title,
        }
    }

    /// Render into what a document sink consumes; charted reports rasterize here
    pub fn to_payload(&self) -> ReportResult<DocumentPayload> {
        match self {
            Report::Empty(report) => Ok(DocumentPayload {
                title: report.title.clone(),
                lines: vec![report.notice.clone()],
                image: None,
            }),
            Report::Charted(report) => Ok(DocumentPayload {
                title: report.title.clone(),
                lines: report.lines(),
                image: Some(report.chart()?),
            }),
        }
    }
}

impl EmptyReport {
    pub fn new(hours: u32) -> Self {
        Self {
            title: REPORT_TITLE.to_string(),
            notice: format!("No data available for last {} hours.", hours),
        }
    }
}

impl ChartedReport {
    pub fn from_window(window: &Window) -> Self {
        let mut skipped = 0;
        let points = window
            .observations
            .iter()
            .filter_map(|obs| match obs.instant() {
                Some(at) => Some(ChartPoint {
                    at,
                    temperature: obs.temperature,
                    humidity: obs.humidity,
                }),
                None => {
                    warn!(timestamp = %obs.timestamp, "skipping unparsable timestamp in report");
                    skipped += 1;
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(points = points.len(), skipped, "Built charted report");
        Self {
            title: REPORT_TITLE.to_string(),
            location: window.location,
            range: window.requested_range(),
            points,
            skipped,
        }
    }

    pub fn location_line(&self) -> String {
        match self.location {
            Some(location) => format!("Location: {}", location),
            None => "Location: All locations".to_string(),
        }
    }

    pub fn date_range_line(&self) -> String {
        let (start, end) = self.range;
        format!(
            "Date range: {} UTC to {} UTC",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        )
    }

    pub fn lines(&self) -> Vec<String> {
        vec![self.location_line(), self.date_range_line()]
    }

    pub fn chart(&self) -> ReportResult<RasterImage> {
        render_chart(&self.points, self.range)
    }
}
