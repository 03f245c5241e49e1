//! Status handlers

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use super::server::StatusState;
use crate::core::domain::Counters;
use crate::sweeper::SchedulerState;

/// Liveness plus the scheduler's current state
pub async fn health_check(State(state): State<StatusState>) -> Json<serde_json::Value> {
    let scheduler = match *state.scheduler.borrow() {
        SchedulerState::Idle => "idle",
        SchedulerState::Running => "running",
    };
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "scheduler": scheduler,
    }))
}

/// Current in-memory counters
pub async fn get_counts(State(state): State<StatusState>) -> Json<Counters> {
    Json(state.counters.snapshot())
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<StatusState>) -> Result<String, (StatusCode, String)> {
    match &state.metrics {
        Some(m) => m
            .export_metrics()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
        None => Err((StatusCode::NOT_FOUND, "metrics disabled".to_string())),
    }
}
