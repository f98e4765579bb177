// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demuxes the pool's single, unordered result stream back to whichever
//! `run_once` call submitted each job (spec §5: "Job results on the
//! pool's result channel are not ordered with respect to submission; the
//! orchestrator must key them by job id").

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use xport_core::{JobId, JobResult};
use xport_pool::JobResultStream;

#[derive(Clone)]
pub struct ResultRouter {
    pending: Arc<Mutex<HashMap<JobId, oneshot::Sender<JobResult>>>>,
}

impl ResultRouter {
    /// Spawns the demultiplexing task and returns a handle plus the task's
    /// `JoinHandle` (resolves once the pool's result stream closes).
    pub fn spawn(results: JobResultStream) -> (Self, JoinHandle<()>) {
        let pending: Arc<Mutex<HashMap<JobId, oneshot::Sender<JobResult>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let router = Self { pending: pending.clone() };

        let handle = tokio::spawn(async move {
            let mut results = results;
            while let Some(result) = results.next().await {
                if let Some(tx) = pending.lock().remove(&result.job_id) {
                    let _ = tx.send(result);
                } else {
                    tracing::debug!(job_id = %result.job_id, "result for an unregistered job");
                }
            }
            // The pool's result stream closed: any still-pending waiters
            // will see their receiver dropped and surface a recv error.
            pending.lock().clear();
        });

        (router, handle)
    }

    /// Registers interest in `job_id`'s eventual result. Must be called
    /// before the job is submitted to the pool, to avoid a race against a
    /// fast-completing job.
    pub fn register(&self, job_id: JobId) -> oneshot::Receiver<JobResult> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(job_id, tx);
        rx
    }

    pub fn unregister(&self, job_id: &JobId) {
        self.pending.lock().remove(job_id);
    }
}
