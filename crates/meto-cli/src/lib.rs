use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use meto_core::{DocumentSink, Fetcher, Location, ObservationStore, TabularSink};
use meto_ingest::{IngestError, Ingestor};
use meto_report::{export_report, export_table, ExportError};
use meto_sinks::{PDF_CONTENT_TYPE, XLSX_CONTENT_TYPE};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use serde::Deserialize;
use serde_json::json;

pub const XLSX_FILENAME: &str = "weather_last_48h.xlsx";
pub const PDF_FILENAME: &str = "weather_report.pdf";

/// Collaborators the HTTP surface is wired to
pub struct Services {
    pub store: Arc<dyn ObservationStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub table_sink: Arc<dyn TabularSink>,
    pub document_sink: Arc<dyn DocumentSink>,
}

/// Request-independent knobs, usually taken from `AppConfig`
#[derive(Debug, Clone)]
pub struct Settings {
    pub window_hours: u32,
    pub past_days: u32,
    pub timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_hours: meto_core::DEFAULT_WINDOW_HOURS,
            past_days: 2,
            timezone: "UTC".to_string(),
        }
    }
}

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    requests_total: IntCounter,
    ingest_requested_total: IntCounter,
    ingest_inserted_total: IntCounter,
    store: Arc<dyn ObservationStore>,
    ingestor: Ingestor,
    table_sink: Arc<dyn TabularSink>,
    document_sink: Arc<dyn DocumentSink>,
    settings: Settings,
}

fn register_counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("valid counter definition");
    registry
        .register(Box::new(counter.clone()))
        .expect("counter registered once");
    counter
}

pub fn build_app(services: Services, settings: Settings) -> (Router, Arc<AppState>) {
    let registry = Registry::new();
    let requests_total =
        register_counter(&registry, "meto_requests_total", "Total HTTP requests served");
    let ingest_requested_total = register_counter(
        &registry,
        "meto_ingest_requested_total",
        "Upstream records seen by ingest",
    );
    let ingest_inserted_total = register_counter(
        &registry,
        "meto_ingest_inserted_total",
        "Records newly written by ingest",
    );

    let ingestor = Ingestor::new(services.fetcher, Arc::clone(&services.store))
        .with_timezone(settings.timezone.clone());

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        requests_total,
        ingest_requested_total,
        ingest_inserted_total,
        store: services.store,
        ingestor,
        table_sink: services.table_sink,
        document_sink: services.document_sink,
        settings,
    });

    let router = Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/weather-report", get(weather_report))
        .route("/export/excel", get(export_excel))
        .route("/export/pdf", get(export_pdf))
        .with_state(Arc::clone(&state));

    (router, state)
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

/// Failures surfaced to HTTP clients as `{"error", "detail"}`
#[derive(Debug)]
pub enum ApiError {
    InvalidLocation(String),
    Ingest(IngestError),
    Export(ExportError),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::Ingest(e)
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        ApiError::Export(e)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidLocation(_) => (StatusCode::BAD_REQUEST, "invalid_location"),
            ApiError::Ingest(IngestError::UpstreamUnavailable(_)) => {
                (StatusCode::BAD_GATEWAY, "upstream_unavailable")
            }
            ApiError::Ingest(IngestError::MalformedUpstreamResponse(_)) => {
                (StatusCode::BAD_GATEWAY, "malformed_upstream_response")
            }
            ApiError::Ingest(IngestError::Storage(_)) | ApiError::Export(ExportError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_unavailable")
            }
            ApiError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "report_failed"),
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::InvalidLocation(detail) => detail.clone(),
            ApiError::Ingest(e) => e.to_string(),
            ApiError::Export(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let detail = self.detail();
        if status.is_server_error() {
            tracing::error!(error = code, %detail, "request failed");
        } else {
            tracing::warn!(error = code, %detail, "request rejected");
        }
        (status, Json(json!({ "error": code, "detail": detail }))).into_response()
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Weather API is running",
        "endpoints": {
            "/weather-report?lat=47.37&lon=8.55": "Fetch & store last 2 days of weather data",
            "/export/excel": "Download last 48h weather data as Excel",
            "/export/pdf": "Download last 48h weather data as PDF report",
        }
    }))
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.inc();
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

#[derive(Debug, Deserialize)]
struct IngestQuery {
    lat: f64,
    lon: f64,
}

/// Optional location filter; applied only when both coordinates are given
#[derive(Debug, Deserialize)]
struct FilterQuery {
    lat: Option<f64>,
    lon: Option<f64>,
}

impl FilterQuery {
    fn location(&self) -> Option<Location> {
        Location::from_parts(self.lat, self.lon)
    }
}

async fn weather_report(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IngestQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.requests_total.inc();

    if !(-90.0..=90.0).contains(&q.lat) || !(-180.0..=180.0).contains(&q.lon) {
        return Err(ApiError::InvalidLocation(format!(
            "lat={}, lon={} is not a valid coordinate",
            q.lat, q.lon
        )));
    }

    let location = Location::new(q.lat, q.lon);
    let summary = state
        .ingestor
        .ingest(location, state.settings.past_days)
        .await?;

    state.ingest_requested_total.inc_by(summary.requested as u64);
    state.ingest_inserted_total.inc_by(summary.inserted);

    Ok(Json(json!({
        "message": "Weather data fetched and stored.",
        "location": location,
        "requested_records": summary.requested,
        "rejected_records": summary.rejected,
        "db_inserted_rows": summary.inserted,
    })))
}

async fn export_excel(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    state.requests_total.inc();

    let bytes = export_table(
        state.store.as_ref(),
        Arc::clone(&state.table_sink),
        state.settings.window_hours,
        q.location(),
    )
    .await?;

    Ok(attachment(XLSX_CONTENT_TYPE, XLSX_FILENAME, bytes))
}

async fn export_pdf(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    state.requests_total.inc();

    let bytes = export_report(
        state.store.as_ref(),
        Arc::clone(&state.document_sink),
        state.settings.window_hours,
        q.location(),
    )
    .await?;

    Ok(attachment(PDF_CONTENT_TYPE, PDF_FILENAME, bytes))
}

fn attachment(content_type: &'static str, filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}
