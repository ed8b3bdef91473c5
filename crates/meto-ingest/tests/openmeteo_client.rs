use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use meto_core::{FetchError, FetchRequest, Fetcher, Location};
use meto_db::MemoryStore;
use meto_ingest::{IngestError, Ingestor, OpenMeteoClient, HOURLY_VARIABLES};
use serde_json::{json, Value};

async fn forecast(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "latitude": params.get("latitude"),
        "utc_offset_seconds": 0,
        "echo": params,
        "hourly": {
            "time": ["2024-05-01T00:00", "2024-05-01T01:00"],
            "temperature_2m": [10.5, 11.0],
            "relative_humidity_2m": [80, 79]
        }
    }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn not_json() -> &'static str {
    "<html>maintenance</html>"
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/v1/forecast", get(forecast))
        .route("/broken", get(broken))
        .route("/html", get(not_json))
        .route("/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn request() -> FetchRequest {
    FetchRequest {
        location: Location::new(47.37, 8.55),
        past_days: 2,
        timezone: "UTC".to_string(),
    }
}

#[tokio::test]
async fn sends_expected_query_parameters() {
    let addr = serve().await;
    let client =
        OpenMeteoClient::new(&format!("http://{}/v1/forecast", addr), Duration::from_secs(5))
            .unwrap();

    let body = client.fetch(&request()).await.unwrap();
    let echo = &body["echo"];
    assert_eq!(echo["latitude"], "47.37");
    assert_eq!(echo["longitude"], "8.55");
    assert_eq!(echo["hourly"], HOURLY_VARIABLES);
    assert_eq!(echo["past_days"], "2");
    assert_eq!(echo["timezone"], "UTC");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let addr = serve().await;
    let client =
        OpenMeteoClient::new(&format!("http://{}/broken", addr), Duration::from_secs(5)).unwrap();

    let err = client.fetch(&request()).await.unwrap_err();
    assert!(matches!(err, FetchError::Status(500)));
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let addr = serve().await;
    let client =
        OpenMeteoClient::new(&format!("http://{}/html", addr), Duration::from_secs(5)).unwrap();

    let err = client.fetch(&request()).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let addr = serve().await;
    let client =
        OpenMeteoClient::new(&format!("http://{}/slow", addr), Duration::from_millis(200))
            .unwrap();

    let err = client.fetch(&request()).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    // grab a free port, then release it so nothing is listening there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        OpenMeteoClient::new(&format!("http://{}/v1/forecast", addr), Duration::from_secs(2))
            .unwrap();

    let err = client.fetch(&request()).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn ingest_end_to_end_against_local_upstream() {
    let addr = serve().await;
    let client =
        OpenMeteoClient::new(&format!("http://{}/v1/forecast", addr), Duration::from_secs(5))
            .unwrap();
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(Arc::new(client), store.clone());

    let summary = ingestor.ingest(Location::new(47.37, 8.55), 2).await.unwrap();
    assert_eq!(summary.requested, 2);
    assert_eq!(summary.inserted, 2);

    let again = ingestor.ingest(Location::new(47.37, 8.55), 2).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(store.len().unwrap(), 2);
}

#[tokio::test]
async fn ingest_maps_upstream_error() {
    let addr = serve().await;
    let client =
        OpenMeteoClient::new(&format!("http://{}/broken", addr), Duration::from_secs(5)).unwrap();
    let ingestor = Ingestor::new(Arc::new(client), Arc::new(MemoryStore::new()));

    let err = ingestor.ingest(Location::new(47.37, 8.55), 2).await.unwrap_err();
    assert!(matches!(err, IngestError::UpstreamUnavailable(_)));
}
