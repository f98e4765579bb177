// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool (spec §4.2).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use xport_core::{ErrorKind, Job, JobResult, XportError};

/// Per-job deadline (spec §4.2: "each execution runs under a 30-second
/// derived deadline").
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(30);

/// Stream of [`JobResult`]s produced by the pool. Single-consumer: calling
/// [`WorkerPool::results`] a second time yields an already-closed stream.
pub type JobResultStream = UnboundedReceiverStream<JobResult>;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker tasks; defaults to host parallelism.
    pub workers: usize,
    /// Bounded job queue capacity; defaults to `workers * 2` (spec §4.2).
    pub queue_capacity: usize,
    /// Per-job deadline (spec §4.2).
    pub job_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self { workers, queue_capacity: workers * 2, job_timeout: DEFAULT_JOB_TIMEOUT }
    }
}

impl PoolConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers, queue_capacity: workers * 2, job_timeout: DEFAULT_JOB_TIMEOUT }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }
}

/// `{workers, processed, failed, avgDuration, running}` (spec §3). All
/// counters are monotone non-decreasing; readable concurrently.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub workers: usize,
    pub processed: u64,
    pub failed: u64,
    pub avg_duration: Duration,
    pub running: bool,
}

struct StatsInner {
    processed: AtomicU64,
    failed: AtomicU64,
    total_duration_ms: AtomicU64,
    running: AtomicBool,
}

impl StatsInner {
    fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    fn record(&self, success: bool, duration: Duration) {
        if success {
            self.processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_duration_ms.fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    fn snapshot(&self, workers: usize) -> PoolStats {
        let processed = self.processed.load(Ordering::Relaxed);
        let total_ms = self.total_duration_ms.load(Ordering::Relaxed);
        let avg_duration = if processed == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(total_ms / processed)
        };
        PoolStats {
            workers,
            processed,
            failed: self.failed.load(Ordering::Relaxed),
            avg_duration,
            running: self.running.load(Ordering::Relaxed),
        }
    }
}

/// Bounded concurrent job executor (spec §4.2). `start`/`stop` are
/// idempotent; jobs are executed at most once and their outcome is
/// emitted exactly once on the result stream.
pub struct WorkerPool {
    config: PoolConfig,
    job_tx: Mutex<Option<mpsc::Sender<Arc<dyn Job>>>>,
    job_rx: Arc<AsyncMutex<mpsc::Receiver<Arc<dyn Job>>>>,
    result_tx: Mutex<Option<mpsc::UnboundedSender<JobResult>>>,
    result_rx: Mutex<Option<mpsc::UnboundedReceiver<JobResult>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<StatsInner>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        Self {
            config,
            job_tx: Mutex::new(Some(job_tx)),
            job_rx: Arc::new(AsyncMutex::new(job_rx)),
            result_tx: Mutex::new(Some(result_tx)),
            result_rx: Mutex::new(Some(result_rx)),
            handles: Mutex::new(Vec::new()),
            stats: Arc::new(StatsInner::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Spawns `config.workers` worker tasks. Idempotent: a second call is
    /// a no-op (spec §4.2).
    pub fn start(&self) {
        if self.started.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err()
        {
            return;
        }
        self.stats.running.store(true, Ordering::SeqCst);

        let Some(result_tx) = self.result_tx.lock().clone() else { return };
        let mut handles = self.handles.lock();
        for _ in 0..self.config.workers.max(1) {
            let job_rx = self.job_rx.clone();
            let result_tx = result_tx.clone();
            let stats = self.stats.clone();
            let job_timeout = self.config.job_timeout;
            handles.push(tokio::spawn(worker_loop(job_rx, result_tx, stats, job_timeout)));
        }
    }

    /// `submit(job) -> {ok | ErrPoolFull | ErrCancelled}`. Non-blocking:
    /// when the queue is full, returns `PoolFull` immediately so callers
    /// can apply backpressure (spec §4.2).
    pub fn submit(&self, job: Arc<dyn Job>) -> Result<(), XportError> {
        let guard = self.job_tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(XportError::cancelled());
        };
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(XportError::pool_full()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(XportError::cancelled()),
        }
    }

    /// `results() -> lazy sequence of JobResult (single consumer)`. Taking
    /// the stream a second time returns an immediately-closed one.
    pub fn results(&self) -> JobResultStream {
        match self.result_rx.lock().take() {
            Some(rx) => UnboundedReceiverStream::new(rx),
            None => {
                let (_tx, rx) = mpsc::unbounded_channel();
                UnboundedReceiverStream::new(rx)
            }
        }
    }

    /// Drains inflight jobs, closes the results channel, and reports final
    /// stats. Idempotent (spec §4.2, §5).
    pub async fn stop(&self) -> PoolStats {
        if self.stopped.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            self.job_tx.lock().take();
            let handles: Vec<_> = self.handles.lock().drain(..).collect();
            for handle in handles {
                let _ = handle.await;
            }
            self.result_tx.lock().take();
            self.stats.running.store(false, Ordering::SeqCst);
        }
        self.stats()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot(self.config.workers)
    }
}

async fn worker_loop(
    job_rx: Arc<AsyncMutex<mpsc::Receiver<Arc<dyn Job>>>>,
    result_tx: mpsc::UnboundedSender<JobResult>,
    stats: Arc<StatsInner>,
    job_timeout: Duration,
) {
    loop {
        let job = {
            let mut rx = job_rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };

        let job_id = job.id();
        let started = Instant::now();
        let outcome = run_with_deadline(job, job_timeout).await;
        let duration = started.elapsed();

        let result = match outcome {
            Ok(payload) => {
                stats.record(true, duration);
                JobResult::success(job_id, duration, payload)
            }
            Err(kind) => {
                stats.record(false, duration);
                JobResult::failure(job_id, duration, kind)
            }
        };
        // The consumer may have dropped the stream; nothing further to do.
        let _ = result_tx.send(result);
    }
}

/// Runs `job.execute` as its own task so a panic inside the job is caught
/// at the task boundary (via `JoinError`) and translated to
/// `ProcessingFailed` rather than escaping the pool (spec §4.2, §9).
async fn run_with_deadline(
    job: Arc<dyn Job>,
    job_timeout: Duration,
) -> Result<Option<serde_json::Value>, ErrorKind> {
    let deadline = Instant::now() + job_timeout;
    let handle = tokio::spawn(async move { job.execute(deadline).await });
    let abort = handle.abort_handle();

    match tokio::time::timeout(job_timeout, handle).await {
        Ok(Ok(Ok(payload))) => Ok(payload),
        Ok(Ok(Err(err))) => Err(err.kind()),
        Ok(Err(join_err)) => {
            tracing::error!(error = %join_err, "job panicked");
            Err(ErrorKind::ProcessingFailed)
        }
        Err(_elapsed) => {
            abort.abort();
            Err(ErrorKind::Timeout)
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
