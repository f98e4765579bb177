// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TelemetryManager`: the single owner of the logging, metrics, tracing,
//! health, and alerting subsystems (spec §3), plus the HTTP surface that
//! exposes them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::alert::AlertManager;
use crate::health::HealthChecker;
use crate::logger::Logger;
use crate::metrics::Metrics;
use crate::server::{self, TelemetryState};
use crate::tracer::Tracer;

pub struct TelemetryManager {
    pub logger: Arc<dyn Logger>,
    pub metrics: Arc<Metrics>,
    pub tracer: Arc<Tracer>,
    pub health: Arc<HealthChecker>,
    pub alerts: Arc<AlertManager>,
}

impl TelemetryManager {
    pub fn new(
        logger: Arc<dyn Logger>,
        metrics: Arc<Metrics>,
        tracer: Arc<Tracer>,
        health: Arc<HealthChecker>,
        alerts: Arc<AlertManager>,
    ) -> Self {
        metrics.start_time_seconds.set(unix_secs_now() as f64);
        Self { logger, metrics, tracer, health, alerts }
    }

    fn http_state(&self) -> TelemetryState {
        TelemetryState {
            metrics: self.metrics.clone(),
            health: self.health.clone(),
            alerts: self.alerts.clone(),
        }
    }

    pub fn router(&self) -> axum::Router {
        server::router(self.http_state())
    }

    /// Binds and serves the HTTP surface until the process is shut down.
    /// Intended to run as its own `tokio::spawn`ed task.
    pub async fn serve(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await
    }
}

fn unix_secs_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Default process memory sampling interval for the `memory_usage_bytes`
/// gauge (spec §4.8). Background sampling itself lives with the caller
/// that owns the runtime (the scheduler/daemon entry point), since this
/// crate has no stable source of "current RSS" without an extra
/// platform-specific dependency the corpus does not carry.
pub const DEFAULT_MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
