// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xport-scheduler: the orchestrator (spec §4.1) tying the worker pool,
//! checkpoint store, real-time hub, and alerting together behind
//! `run_once`/`run_scheduled`/`stop`.

pub mod cron;
pub mod guard;
pub mod request;
pub mod router;
pub mod scheduler;

pub use guard::{ConcurrencyGuard, RunToken};
pub use request::{ExportMode, ExportRequest, JobFactory};
pub use router::ResultRouter;
pub use scheduler::{ScheduledRun, Scheduler, SchedulerConfig, DEFAULT_FAILURE_ALERT_THRESHOLD};
