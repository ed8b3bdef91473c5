//! Report building for the weather service
//!
//! Turns a window of observations into either a table for a spreadsheet
//! sink or a document (title, metadata, dual-axis chart) for a document
//! sink. Rendering is CPU-bound and runs on the blocking pool.

pub mod chart;
pub mod document;
pub mod table;

pub use chart::{render_chart, ChartPoint, CHART_HEIGHT, CHART_WIDTH};
pub use document::{ChartedReport, EmptyReport, Report, REPORT_TITLE};
pub use table::{project, SHEET_NAME};

use chrono::{DateTime, Utc};
use meto_core::{
    select_window_at, DocumentSink, Location, ObservationStore, StoreError, TabularSink,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors while rendering a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to register chart font")]
    Font,

    #[error("Chart rendering failed: {0}")]
    Chart(String),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Errors from an export pipeline
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Sink failed: {0}")]
    Sink(#[from] anyhow::Error),

    #[error("Export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Spreadsheet bytes for the last `hours` hours
pub async fn export_table(
    store: &dyn ObservationStore,
    sink: Arc<dyn TabularSink>,
    hours: u32,
    location: Option<Location>,
) -> Result<Vec<u8>, ExportError> {
    export_table_at(store, sink, Utc::now(), hours, location).await
}

#[instrument(skip(store, sink))]
pub async fn export_table_at(
    store: &dyn ObservationStore,
    sink: Arc<dyn TabularSink>,
    now: DateTime<Utc>,
    hours: u32,
    location: Option<Location>,
) -> Result<Vec<u8>, ExportError> {
    let window = select_window_at(store, now, hours, location).await?;
    info!(rows = window.len(), "Exporting table");

    let bytes = tokio::task::spawn_blocking(move || sink.write_table(&project(&window))).await??;
    Ok(bytes)
}

/// Document bytes for the last `hours` hours
pub async fn export_report(
    store: &dyn ObservationStore,
    sink: Arc<dyn DocumentSink>,
    hours: u32,
    location: Option<Location>,
) -> Result<Vec<u8>, ExportError> {
    export_report_at(store, sink, Utc::now(), hours, location).await
}

#[instrument(skip(store, sink))]
pub async fn export_report_at(
    store: &dyn ObservationStore,
    sink: Arc<dyn DocumentSink>,
    now: DateTime<Utc>,
    hours: u32,
    location: Option<Location>,
) -> Result<Vec<u8>, ExportError> {
    let window = select_window_at(store, now, hours, location).await?;
    info!(rows = window.len(), "Exporting report");

    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ExportError> {
        let payload = Report::build(&window).to_payload()?;
        Ok(sink.write_document(&payload)?)
    })
    .await??;
    Ok(bytes)
}
