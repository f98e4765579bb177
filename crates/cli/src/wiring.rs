// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assembles every crate in the workspace into one running process, the
//! way the teacher's `daemon::lifecycle::startup` builds its runtime from
//! a loaded config.

use std::sync::Arc;
use std::time::Duration;

use xport_core::{Clock, ComponentHealth, HealthStatus, SystemClock, XportError};
use xport_hub::{Hub, DEFAULT_PING_INTERVAL};
use xport_net::{BucketConfig, DisciplinedClient, HttpClientConfig, RateLimiter};
use xport_pool::{PoolConfig, WorkerPool};
use xport_scheduler::{JobFactory, Scheduler, SchedulerConfig};
use xport_security::{AuditLog, EncryptedFileKeyringBackend, EnvKeyringBackend, FilesystemGuard, KeyringBackend, OsKeyringBackend};
use xport_storage::CheckpointStore;
use xport_telemetry::{logger_for, AlertManager, ClosureProbe, HealthChecker, LogFormat, Metrics, TelemetryManager, Tracer};

use crate::config::{Config, KeyringBackendKind};

pub struct App {
    pub config: Config,
    pub telemetry: Arc<TelemetryManager>,
    pub hub: Hub,
    pub scheduler: Arc<Scheduler<SystemClock>>,
    pub audit: Arc<AuditLog>,
    pub http_client: Arc<DisciplinedClient>,
    #[allow(dead_code)]
    pub keyring: Arc<dyn KeyringBackend>,
    hub_owner_handle: tokio::task::JoinHandle<()>,
}

impl App {
    pub async fn shutdown(self) {
        self.scheduler.stop().await;
        self.hub_owner_handle.abort();
    }
}

fn data_dir() -> std::path::PathBuf {
    dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from(".")).join("xport")
}

fn build_keyring(config: &Config, guard: &FilesystemGuard, dir: &std::path::Path) -> Result<Arc<dyn KeyringBackend>, XportError> {
    match config.security.keyring_backend {
        KeyringBackendKind::Os => Ok(Arc::new(OsKeyringBackend)),
        KeyringBackendKind::Env => Ok(Arc::new(EnvKeyringBackend::new())),
        KeyringBackendKind::EncryptedFile => {
            Ok(Arc::new(EncryptedFileKeyringBackend::open(dir.join("keyring"), guard.clone())?))
        }
    }
}

fn build_telemetry(config: &Config, pool: &Arc<WorkerPool>) -> TelemetryManager {
    let format = if config.logging.format == "structured" { LogFormat::Structured } else { LogFormat::Visual };
    let logger = logger_for(format);
    let metrics = Arc::new(Metrics::new());
    let tracer = Arc::new(Tracer::new(if config.monitoring.tracing_enabled { 1.0 } else { 0.0 }, |_span| {}));

    let health = Arc::new(HealthChecker::new(env!("CARGO_PKG_VERSION"), Duration::from_secs(5)));
    let pool_for_probe = pool.clone();
    health.register(Arc::new(ClosureProbe::new("worker_pool", move || {
        let pool = pool_for_probe.clone();
        async move {
            let stats = pool.stats();
            ComponentHealth {
                status: HealthStatus::Healthy,
                message: Some(format!("{} processed, {} failed, running={}", stats.processed, stats.failed, stats.running)),
                checked_at_ms: SystemClock.epoch_ms(),
            }
        }
    })));

    let alerts = Arc::new(AlertManager::new(Vec::new(), Duration::from_secs(300)));

    TelemetryManager::new(logger, metrics, tracer, health, alerts)
}

/// Builds the full runtime from a loaded [`Config`] and a caller-supplied
/// job factory (the Trakt-fetching seam, spec.md §1).
pub async fn build(config: Config, jobs: Arc<dyn JobFactory>) -> Result<App, XportError> {
    let dir = data_dir();
    let allowlist = vec![dir.clone(), config.letterboxd.export_dir.clone()];
    let guard = FilesystemGuard::new(allowlist);
    guard.create_dir_all(&dir)?;

    let audit = Arc::new(AuditLog::new(dir.join("audit.log"), guard.clone(), false));
    // The guard used everywhere else gets the audit log wired in; the one
    // above (used by `AuditLog` itself) stays unaudited to avoid recursion.
    let guard = guard.with_audit_log(audit.clone());
    let keyring = build_keyring(&config, &guard, &dir)?;

    let checkpoints = Arc::new(CheckpointStore::new(dir.join("checkpoints"), guard.clone()));

    let bucket = BucketConfig { capacity: config.rate_limit.burst_limit, refill_rate: config.rate_limit.default_limit };
    let overrides = config
        .rate_limit
        .limits
        .iter()
        .map(|(service, limit)| {
            (service.clone(), BucketConfig { capacity: limit.burst_capacity, refill_rate: limit.requests_per_minute / 60.0 })
        })
        .collect();
    let rate_limiter = Arc::new(
        RateLimiter::new(config.rate_limit.enabled, bucket)
            .with_audit_log(audit.clone())
            .with_service_limits(overrides),
    );
    let http_client = Arc::new(
        DisciplinedClient::new(reqwest::Client::new(), rate_limiter, HttpClientConfig::default()),
    );

    let pool = Arc::new(WorkerPool::new(PoolConfig::default()));
    let telemetry = Arc::new(build_telemetry(&config, &pool));

    let (hub, hub_owner_handle) = Hub::spawn(SystemClock, DEFAULT_PING_INTERVAL);

    let scheduler = Scheduler::new(
        pool,
        checkpoints,
        hub.clone(),
        telemetry.alerts.clone(),
        jobs,
        SystemClock,
        SchedulerConfig::default(),
    );

    Ok(App { config, telemetry, hub, scheduler, audit, http_client, keyring, hub_owner_handle })
}

/// Merges the telemetry HTTP surface with the real-time hub's `/ws` and
/// `/events` transports into the single router the process serves (spec
/// §6).
pub fn http_router(app: &App) -> axum::Router {
    app.telemetry.router().merge(xport_hub::transports::router(app.hub.clone()))
}

#[cfg(test)]
#[path = "wiring_tests.rs"]
mod tests;
