// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`Job`] contract executed by the worker pool, and the outcome it
//! produces.

use crate::error::{ErrorKind, XportError};
use async_trait::async_trait;
use std::time::{Duration, Instant};

crate::define_id! {
    /// Identity of a single unit of work submitted to the worker pool.
    ///
    /// Stable for the lifetime of the job; used for result dispatch and
    /// log/metric correlation.
    pub struct JobId("job-");
}

/// A unit of work executed by the worker pool.
///
/// Implementors must be safe to run under a deadline and must not assume
/// they run to completion — `execute` may be dropped mid-poll on
/// cancellation.
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable identity, used for correlation in logs/metrics and for
    /// keying results on the (unordered) result channel.
    fn id(&self) -> JobId;

    /// Run the job. `deadline` is the instant by which the job must either
    /// complete or be considered timed out by the caller.
    async fn execute(&self, deadline: Instant) -> Result<Option<serde_json::Value>, XportError>;
}

/// Outcome of a completed (or panicked) job, emitted exactly once per job
/// on the pool's result stream.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: JobId,
    pub error_kind: Option<ErrorKind>,
    pub duration: Duration,
    pub payload: Option<serde_json::Value>,
}

impl JobResult {
    pub fn success(job_id: JobId, duration: Duration, payload: Option<serde_json::Value>) -> Self {
        Self { job_id, error_kind: None, duration, payload }
    }

    pub fn failure(job_id: JobId, duration: Duration, kind: ErrorKind) -> Self {
        Self { job_id, error_kind: Some(kind), duration, payload: None }
    }

    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
