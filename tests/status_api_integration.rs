use axum::body::Body;
use axum::http::{Request, StatusCode};
use hd_sweeper::api::{StatusServer, StatusState};
use hd_sweeper::core::domain::{Counters, SweepOutcome};
use hd_sweeper::monitoring::SweepMetrics;
use hd_sweeper::storage::{CounterService, MemoryCounterStore};
use hd_sweeper::sweeper::SchedulerState;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

async fn state(metrics: Option<Arc<SweepMetrics>>) -> (StatusState, watch::Sender<SchedulerState>) {
    let store = Arc::new(MemoryCounterStore::with_counters(Counters { check_count: 8, transfer_count: 1 }));
    let (counters, _task) = CounterService::start(store).await;
    let (tx, rx) = watch::channel(SchedulerState::Idle);
    (StatusState { counters, metrics, scheduler: rx }, tx)
}

async fn get(state: StatusState, uri: &str) -> (StatusCode, Vec<u8>) {
    let app = StatusServer::create_router(state);
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

#[tokio::test]
async fn health_reports_scheduler_state() {
    let (state, scheduler) = state(None).await;
    scheduler.send_replace(SchedulerState::Running);

    let (status, body) = get(state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["scheduler"], "running");
}

#[tokio::test]
async fn counts_reflect_recorded_events() {
    let (state, _scheduler) = state(None).await;
    state.counters.record_check().await.unwrap();
    state.counters.record_transfer().await.unwrap();

    let (status, body) = get(state, "/api/counts").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"checkCount": 9, "transferCount": 2}));
}

#[tokio::test]
async fn metrics_exposed_when_enabled() {
    let metrics = Arc::new(SweepMetrics::new().unwrap());
    metrics.record_outcome(&SweepOutcome::CheckFailed);
    let (state, _scheduler) = state(Some(metrics)).await;

    let (status, body) = get(state, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("sweeper_outcomes_total{outcome=\"check_failed\"} 1"));
}

#[tokio::test]
async fn metrics_not_found_when_disabled() {
    let (state, _scheduler) = state(None).await;
    let (status, _) = get(state, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bind_fails_fast_when_address_is_taken() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap();
    let (state, _scheduler) = state(None).await;

    let res = StatusServer::new(addr, state).bind().await;

    assert!(res.is_err());
}

#[tokio::test]
async fn bound_server_serves_until_cancelled() {
    let (state, _scheduler) = state(None).await;
    let server = StatusServer::new("127.0.0.1:0".parse().unwrap(), state).bind().await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(server.serve(shutdown.clone()));

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    shutdown.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(5), task).await.unwrap().unwrap().unwrap();
}
