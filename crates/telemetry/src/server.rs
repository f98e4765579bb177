// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process's HTTP surface (spec §6): `/metrics`, `/health`,
//! `/health/ready`, `/health/live`, `/alerts`. `/ws` and `/events` are
//! mounted by `xport-hub`, which nests this router under its own.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;

use crate::alert::AlertManager;
use crate::health::HealthChecker;
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct TelemetryState {
    pub metrics: Arc<Metrics>,
    pub health: Arc<HealthChecker>,
    pub alerts: Arc<AlertManager>,
}

pub fn router(state: TelemetryState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/live", get(liveness_handler))
        .route("/alerts", get(alerts_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<TelemetryState>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn health_handler(State(state): State<TelemetryState>) -> impl IntoResponse {
    let report = state.health.check().await;
    let status = StatusCode::from_u16(report.http_status_code()).unwrap_or(StatusCode::OK);
    (status, Json(report))
}

async fn readiness_handler(State(state): State<TelemetryState>) -> impl IntoResponse {
    let report = state.health.check().await;
    let status = StatusCode::from_u16(report.http_status_code()).unwrap_or(StatusCode::OK);
    (status, if status == StatusCode::OK { "ready" } else { "not ready" })
}

async fn liveness_handler(State(state): State<TelemetryState>) -> impl IntoResponse {
    let _ = state.health.liveness();
    (StatusCode::OK, "alive")
}

async fn alerts_handler(State(state): State<TelemetryState>) -> impl IntoResponse {
    Json(serde_json::json!({ "alerts": state.alerts.history() }))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
