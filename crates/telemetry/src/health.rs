// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health probe registry (spec §3, §4.8). Fans a fixed set of named probes
//! out concurrently, each under its own deadline, and aggregates the
//! results into a [`HealthReport`] via [`HealthStatus::aggregate`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use xport_core::{ComponentHealth, HealthReport, HealthStatus};

#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> ComponentHealth;
}

/// A probe backed by a plain async closure, for components that do not
/// warrant a dedicated type (spec §3's liveness/readiness checks).
pub struct ClosureProbe<F> {
    name: String,
    check_fn: F,
}

impl<F, Fut> ClosureProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ComponentHealth> + Send,
{
    pub fn new(name: impl Into<String>, check_fn: F) -> Self {
        Self { name: name.into(), check_fn }
    }
}

#[async_trait]
impl<F, Fut> HealthProbe for ClosureProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ComponentHealth> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ComponentHealth {
        (self.check_fn)().await
    }
}

pub struct HealthChecker {
    probes: RwLock<Vec<Arc<dyn HealthProbe>>>,
    probe_timeout: Duration,
    version: String,
    started_at: Instant,
}

impl HealthChecker {
    pub fn new(version: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            probes: RwLock::new(Vec::new()),
            probe_timeout,
            version: version.into(),
            started_at: Instant::now(),
        }
    }

    pub fn register(&self, probe: Arc<dyn HealthProbe>) {
        self.probes.write().push(probe);
    }

    /// Run every registered probe concurrently with an individual
    /// deadline; a probe that times out or panics reports `Unknown`
    /// rather than failing the whole check (spec §4.8).
    pub async fn check(&self) -> HealthReport {
        let probes: Vec<Arc<dyn HealthProbe>> = self.probes.read().clone();
        let now_ms = unix_ms_now();

        let futures = probes.into_iter().map(|probe| async move {
            let name = probe.name().to_string();
            let result = tokio::time::timeout(self.probe_timeout, probe.check()).await;
            let component = result.unwrap_or_else(|_| ComponentHealth {
                status: HealthStatus::Unknown,
                message: Some("probe timed out".to_string()),
                checked_at_ms: unix_ms_now(),
            });
            (name, component)
        });

        let results = futures_util::future::join_all(futures).await;
        let mut components: HashMap<String, ComponentHealth> = HashMap::new();
        let mut statuses = Vec::new();
        for (name, component) in results {
            statuses.push(component.status);
            components.insert(name, component);
        }

        let status = HealthStatus::aggregate(&statuses);
        HealthReport {
            status,
            timestamp_ms: now_ms,
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            components,
        }
    }

    /// Liveness is process-level: always healthy once reachable (spec §6
    /// `GET /health/live`).
    pub fn liveness(&self) -> HealthReport {
        HealthReport {
            status: HealthStatus::Healthy,
            timestamp_ms: unix_ms_now(),
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            components: HashMap::new(),
        }
    }
}

fn unix_ms_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
