use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use meto_cli::{build_app, set_ready, Services, Settings};
use meto_core::{FetchError, FetchRequest, Fetcher, Location, Observation, ObservationStore, StoreError};
use meto_db::MemoryStore;
use meto_sinks::{PdfSink, XlsxSink};
use serde_json::{json, Value};
use tower::ServiceExt;

enum Upstream {
    Hours(i64),
    Down,
    Malformed,
}

struct StubFetcher {
    upstream: Upstream,
    anchor: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, _request: &FetchRequest) -> Result<Value, FetchError> {
        match self.upstream {
            Upstream::Hours(n) => {
                let times: Vec<String> = (1..=n)
                    .rev()
                    .map(|h| (self.anchor - Duration::hours(h)).format("%Y-%m-%dT%H:00").to_string())
                    .collect();
                let temps: Vec<f64> = (0..n).map(|h| 10.0 + h as f64).collect();
                let hums: Vec<f64> = (0..n).map(|h| 60.0 - h as f64).collect();
                Ok(json!({
                    "utc_offset_seconds": 0,
                    "hourly": {
                        "time": times,
                        "temperature_2m": temps,
                        "relative_humidity_2m": hums
                    }
                }))
            }
            Upstream::Down => Err(FetchError::Transport("connection refused".to_string())),
            Upstream::Malformed => Ok(json!({"error": true, "reason": "bad request"})),
        }
    }
}

struct DownStore;

#[async_trait::async_trait]
impl ObservationStore for DownStore {
    async fn insert_batch(&self, _records: &[Observation]) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("database is locked".to_string()))
    }

    async fn query_window(
        &self,
        _since: DateTime<Utc>,
        _location: Option<Location>,
    ) -> Result<Vec<Observation>, StoreError> {
        Err(StoreError::Unavailable("database is locked".to_string()))
    }
}

fn app_with(store: Arc<dyn ObservationStore>, upstream: Upstream) -> (Router, Arc<meto_cli::AppState>) {
    build_app(
        Services {
            store,
            fetcher: Arc::new(StubFetcher {
                upstream,
                anchor: Utc::now(),
            }),
            table_sink: Arc::new(XlsxSink::new()),
            document_sink: Arc::new(PdfSink::new()),
        },
        Settings::default(),
    )
}

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_ready_metrics_endpoints() {
    let (app, state) = app_with(Arc::new(MemoryStore::new()), Upstream::Hours(3));

    let (status, _, _) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    set_ready(&state, true);
    let (status, _, _) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let ct = headers.get("content-type").unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/plain"));
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("meto_requests_total 1"));
}

#[tokio::test]
async fn root_lists_endpoints() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()), Upstream::Hours(3));

    let (status, body) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]["/export/pdf"].is_string());
}

#[tokio::test]
async fn weather_report_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let (app, _) = app_with(store.clone(), Upstream::Hours(3));

    let (status, first) = get_json(&app, "/weather-report?lat=47.37&lon=8.55").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Weather data fetched and stored.");
    assert_eq!(first["location"], json!({"lat": 47.37, "lon": 8.55}));
    assert_eq!(first["requested_records"], 3);
    assert_eq!(first["db_inserted_rows"], 3);

    let (_, second) = get_json(&app, "/weather-report?lat=47.37&lon=8.55").await;
    assert_eq!(second["requested_records"], 3);
    assert_eq!(second["db_inserted_rows"], 0);
    assert_eq!(store.len().unwrap(), 3);

    let (_, _, body) = get(&app, "/metrics").await;
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("meto_ingest_requested_total 6"));
    assert!(text.contains("meto_ingest_inserted_total 3"));
}

#[tokio::test]
async fn weather_report_requires_both_coordinates() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()), Upstream::Hours(3));

    let (status, _, _) = get(&app, "/weather-report?lat=47.37").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn weather_report_rejects_out_of_range_coordinates() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()), Upstream::Hours(3));

    let (status, body) = get_json(&app, "/weather-report?lat=123&lon=8.55").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_location");
}

#[tokio::test]
async fn upstream_failures_are_bad_gateway() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()), Upstream::Down);
    let (status, body) = get_json(&app, "/weather-report?lat=47.37&lon=8.55").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_unavailable");
    assert!(body["detail"].as_str().unwrap().contains("connection refused"));

    let (app, _) = app_with(Arc::new(MemoryStore::new()), Upstream::Malformed);
    let (status, body) = get_json(&app, "/weather-report?lat=47.37&lon=8.55").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "malformed_upstream_response");
}

#[tokio::test]
async fn storage_failures_are_internal_errors() {
    let (app, _) = app_with(Arc::new(DownStore), Upstream::Hours(3));

    let (status, body) = get_json(&app, "/weather-report?lat=47.37&lon=8.55").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "storage_unavailable");

    let (status, body) = get_json(&app, "/export/excel").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "storage_unavailable");
}

#[tokio::test]
async fn excel_export_is_an_xlsx_attachment() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()), Upstream::Hours(5));
    get(&app, "/weather-report?lat=47.37&lon=8.55").await;

    let (status, headers, body) = get(&app, "/export/excel?lat=47.37&lon=8.55").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "attachment; filename=weather_last_48h.xlsx"
    );
    assert!(body.starts_with(b"PK"));
}

#[tokio::test]
async fn pdf_export_works_with_and_without_data() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()), Upstream::Hours(5));

    let (status, headers, empty) = get(&app, "/export/pdf").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "application/pdf");
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "attachment; filename=weather_report.pdf"
    );
    assert!(empty.starts_with(b"%PDF"));

    get(&app, "/weather-report?lat=47.37&lon=8.55").await;
    let (status, _, charted) = get(&app, "/export/pdf?lat=47.37").await;
    assert_eq!(status, StatusCode::OK);
    assert!(charted.starts_with(b"%PDF"));
    // the chart image makes the charted report much larger than the notice
    assert!(charted.len() > empty.len());
}
