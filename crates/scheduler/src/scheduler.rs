// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler/orchestrator (spec §4.1): owns the worker pool and the
//! real-time hub, decomposes export requests into jobs, aggregates
//! results into an [`xport_core::ExportReport`], and checkpoints progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use xport_core::{Clock, ErrorKind, ExportReport, ExportScope, OperationId, XportError, OPERATION_TYPE_EXPORT};
use xport_hub::{Hub, MessageType};
use xport_pool::WorkerPool;
use xport_storage::{Checkpoint, CheckpointStore};
use xport_telemetry::{AlertLevel, AlertManager};

use crate::guard::ConcurrencyGuard;
use crate::request::{ExportRequest, JobFactory};
use crate::router::ResultRouter;

/// Default number of consecutive failed runs before a `critical` alert
/// fires (spec §7: "repeated consecutive failures beyond a threshold").
pub const DEFAULT_FAILURE_ALERT_THRESHOLD: u64 = 3;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long `stop()` waits for in-flight runs before giving up on a
    /// graceful drain (spec §5, default 10s).
    pub shutdown_grace: Duration,
    /// Broadcast an `exportProgress` message at most this many items apart.
    pub broadcast_stride_items: u64,
    /// ...or this fraction of the submitted total, whichever is smaller
    /// (spec §4.1: "every 5% or every 100 items, whichever is first").
    pub broadcast_stride_pct: f64,
    /// Fire a synchronous first run when `run_scheduled` starts, before
    /// arming the timer (spec §4.1).
    pub first_run_immediately: bool,
    pub failure_alert_threshold: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: Duration::from_secs(10),
            broadcast_stride_items: 100,
            broadcast_stride_pct: 0.05,
            first_run_immediately: true,
            failure_alert_threshold: DEFAULT_FAILURE_ALERT_THRESHOLD,
        }
    }
}

impl SchedulerConfig {
    fn broadcast_stride(&self, submitted: u64) -> u64 {
        if submitted == 0 {
            return 1;
        }
        let pct_stride = ((submitted as f64) * self.broadcast_stride_pct).ceil() as u64;
        pct_stride.clamp(1, self.broadcast_stride_items.max(1))
    }
}

/// A running `run_scheduled` loop. Dropping or joining this does not stop
/// the loop — call [`Scheduler::stop`] for graceful shutdown.
pub struct ScheduledRun {
    handle: JoinHandle<()>,
}

impl ScheduledRun {
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

pub struct Scheduler<C: Clock> {
    pool: Arc<WorkerPool>,
    checkpoints: Arc<CheckpointStore>,
    hub: Hub,
    alerts: Arc<AlertManager>,
    jobs: Arc<dyn JobFactory>,
    clock: C,
    config: SchedulerConfig,
    guard: ConcurrencyGuard,
    router: ResultRouter,
    router_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    consecutive_failures: AtomicU64,
    in_flight: AtomicU64,
    cancel: CancellationToken,
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(
        pool: Arc<WorkerPool>,
        checkpoints: Arc<CheckpointStore>,
        hub: Hub,
        alerts: Arc<AlertManager>,
        jobs: Arc<dyn JobFactory>,
        clock: C,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        pool.start();
        let (router, router_handle) = ResultRouter::spawn(pool.results());
        Arc::new(Self {
            pool,
            checkpoints,
            hub,
            alerts,
            jobs,
            clock,
            config,
            guard: ConcurrencyGuard::new(),
            router,
            router_handle: std::sync::Mutex::new(Some(router_handle)),
            consecutive_failures: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        })
    }

    /// `runOnce(request) -> Result` (spec §4.1).
    pub async fn run_once(&self, request: ExportRequest) -> Result<ExportReport, XportError> {
        let Some(_token) = self.guard.try_acquire(OPERATION_TYPE_EXPORT, request.scope) else {
            return Err(XportError::new(
                ErrorKind::ProcessingFailed,
                "an export for this scope is already running; tick skipped",
            ));
        };
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = self.run_once_inner(request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn run_once_inner(&self, request: ExportRequest) -> Result<ExportReport, XportError> {
        let started_at_ms = self.clock.epoch_ms();
        let scope_key = request.scope.to_string();

        let (operation_id, mut checkpoint) = self.resume_or_new_checkpoint(request.scope, started_at_ms);

        self.checkpoints.save(&checkpoint)?;

        let jobs = match self.jobs.jobs_for(&request).await {
            Ok(jobs) => jobs,
            Err(e) => {
                self.note_failure().await;
                return Err(e);
            }
        };

        let mut report = ExportReport::new(operation_id.to_string(), request.scope, started_at_ms);
        report.submitted = jobs.len() as u64;
        let stride = self.config.broadcast_stride(report.submitted);

        let mut receivers = Vec::with_capacity(jobs.len());
        for job in jobs {
            let job_id = job.id();
            let rx = self.router.register(job_id);
            match self.pool.submit(job) {
                Ok(()) => receivers.push(Some(rx)),
                Err(_) => {
                    self.router.unregister(&job_id);
                    report.failed += 1;
                    receivers.push(None);
                }
            }
        }

        let mut since_broadcast = 0u64;
        for maybe_rx in receivers {
            if let Some(rx) = maybe_rx {
                match rx.await {
                    Ok(job_result) if job_result.is_success() => report.processed += 1,
                    Ok(_) => report.failed += 1,
                    Err(_) => report.failed += 1,
                }
            }
            since_broadcast += 1;
            if since_broadcast >= stride {
                since_broadcast = 0;
                self.broadcast_progress(&report).await;
            }
        }

        report.finished_at_ms = Some(self.clock.epoch_ms());
        self.broadcast_progress(&report).await;

        if report.failed == 0 {
            let _ = self.checkpoints.delete(&operation_id);
            self.consecutive_failures.store(0, Ordering::Relaxed);
        } else {
            checkpoint.progress = report.progress();
            checkpoint.metadata.insert("scope".to_string(), scope_key);
            let _ = self.checkpoints.save(&checkpoint);
            self.note_failure().await;
        }

        Ok(report)
    }

    /// `runScheduled(cronExpr, request) -> lifetime` (spec §4.1).
    pub async fn run_scheduled(
        self: &Arc<Self>,
        cron_expr: &str,
        request: ExportRequest,
    ) -> Result<ScheduledRun, XportError> {
        let schedule = crate::cron::validate(cron_expr)?;

        if self.config.first_run_immediately {
            tracing::info!(scope = %request.scope, "firing synchronous first scheduled invocation");
            if let Err(e) = self.run_once(request).await {
                tracing::warn!(error = %e, "first scheduled invocation failed");
            }
        }

        let me = self.clone();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                let now = chrono::Utc::now();
                let Some(next) = crate::cron::next_run_after(&schedule, now) else { break };
                let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
                tracing::info!(
                    scope = %request.scope,
                    next_run_epoch_ms = next.timestamp_millis(),
                    "scheduler armed next tick"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => break,
                }
                if cancel.is_cancelled() {
                    break;
                }

                if let Err(e) = me.run_once(request).await {
                    tracing::warn!(error = %e, "scheduled tick failed");
                }
            }
        });

        Ok(ScheduledRun { handle })
    }

    /// Idempotent, bounded-time graceful shutdown (spec §5): cancels
    /// `run_scheduled` loops, waits up to `shutdown_grace` for in-flight
    /// runs, then stops the pool and the hub.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace;
        while self.in_flight.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        self.pool.stop().await;
        self.hub.stop().await;
        if let Some(handle) = self.router_handle.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = handle.await;
        }
    }

    pub fn skipped_tick_count(&self) -> u64 {
        self.guard.skipped_count()
    }

    async fn broadcast_progress(&self, report: &ExportReport) {
        self.hub.broadcast_message(MessageType::ExportProgress, serde_json::json!(report)).await;
    }

    async fn note_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.config.failure_alert_threshold {
            let now_ms = self.clock.epoch_ms();
            self.alerts
                .fire(
                    AlertLevel::Critical,
                    "repeated export failures",
                    format!("{failures} consecutive export runs have failed"),
                    "scheduler",
                    std::collections::HashMap::new(),
                    now_ms,
                )
                .await;
        }
    }

    /// Looks for a preserved checkpoint for this scope to resume from;
    /// otherwise mints a fresh operation id. Checkpoints are searched by
    /// `(operation_type, scope)` rather than operation id, since each
    /// tick is assigned a fresh id (spec §4.1).
    fn resume_or_new_checkpoint(&self, scope: ExportScope, started_at_ms: u64) -> (OperationId, Checkpoint) {
        let scope_str = scope.to_string();
        if let Ok(existing) = self.checkpoints.list() {
            if let Some(found) = existing.into_iter().find(|c| {
                c.operation_type == OPERATION_TYPE_EXPORT && c.metadata.get("scope").map(String::as_str) == Some(scope_str.as_str())
            }) {
                let operation_id = found.operation_id;
                return (operation_id, found);
            }
        }

        let operation_id = OperationId::new();
        let mut checkpoint = Checkpoint::new(operation_id, OPERATION_TYPE_EXPORT, started_at_ms);
        checkpoint.metadata.insert("scope".to_string(), scope_str);
        (operation_id, checkpoint)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
