//! OpenTSDB client against an in-process HTTP server

mod helpers;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use helpers::{oru_message, test_config, Observation, Patient};
use picu_loader::models::DataPoint;
use picu_loader::services::{OpenTsdbClient, TimeSeriesSink};
use picu_loader::{LoadOrchestrator, LoaderError, RunOptions};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Received = Arc<Mutex<Vec<Value>>>;

/// Mock put endpoint answering every request with `status`
async fn spawn_tsdb(status: StatusCode) -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let state = received.clone();

    let app = Router::new().route(
        "/api/put",
        post(move |Json(body): Json<Value>| {
            let state = state.clone();
            async move {
                state.lock().unwrap().push(body);
                status
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), received)
}

fn client(base_url: &str) -> OpenTsdbClient {
    OpenTsdbClient::new(base_url, "/api/put", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_store_posts_opentsdb_json() {
    let (url, received) = spawn_tsdb(StatusCode::NO_CONTENT).await;
    let point = DataPoint::for_subject("vitals.perMin.HeartRate", 1_426_948_205_000, 112.0, "abc123");

    client(&url).store(&point).await.unwrap();

    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "metric": "vitals.perMin.HeartRate",
            "timestamp": 1_426_948_205_000i64,
            "value": 112.0,
            "tags": { "subjectId": "abc123" }
        })
    );
}

#[tokio::test]
async fn test_error_status_is_sink_unavailable() {
    let (url, _received) = spawn_tsdb(StatusCode::BAD_REQUEST).await;
    let point = DataPoint::for_subject("vitals.perMin.HeartRate", 1, 1.0, "abc");

    let err = client(&url).store(&point).await.unwrap_err();
    match err {
        LoaderError::SinkUnavailable { url: reported, reason } => {
            assert!(reported.ends_with("/api/put"));
            assert!(reason.contains("400"));
        }
        other => panic!("Expected SinkUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_sink_unavailable() {
    let point = DataPoint::for_subject("vitals.perMin.HeartRate", 1, 1.0, "abc");
    let err = client("http://127.0.0.1:1").store(&point).await.unwrap_err();
    assert!(matches!(err, LoaderError::SinkUnavailable { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_full_run_against_mock_server() {
    let (url, received) = spawn_tsdb(StatusCode::NO_CONTENT).await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.opentsdb_url = url;
    std::fs::write(
        config.root_dir.join("a.txt"),
        oru_message(
            &Patient::jane(),
            "20150321143005",
            "ZB04",
            &[
                Observation::new("0002-4182", "112", "/min"),
                Observation::new("0002-4bb8", "97", "%"),
            ],
        ),
    )
    .unwrap();

    let summary = LoadOrchestrator::new(config.clone(), RunOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.points_emitted, 2);
    assert!(summary.persisted);
    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1]["metric"], "vitals.percent.SpO2");
    assert_eq!(bodies[1]["timestamp"], 1_426_948_205_000i64);
}
