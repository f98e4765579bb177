// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent-mode stream processing (spec §4.3): a decoder task feeds a
//! `K*2`-buffered job channel, `K` worker tasks transform items, and a
//! single collector task serializes results to the sink. Per-item
//! failures are logged but do not abort the stream; upstream cancellation
//! is respected within one item's worth of latency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use xport_core::{ExportRecord, ExportWriter, XportError};

use crate::config::StreamConfig;

/// Transforms one input item into one output record. Implemented by the
/// domain layer (e.g. a Trakt-history-to-export-row mapping); failures are
/// per-item and do not abort the stream (spec §4.3).
#[async_trait]
pub trait ItemTransformer<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn transform(&self, item: I) -> Result<O, XportError>;
}

/// One worker's outcome for a single input item, keyed by its position in
/// the input stream so progress logging stays meaningful even though
/// results arrive out of submission order.
pub struct ProcessResult<O> {
    pub index: u64,
    pub outcome: Result<O, XportError>,
}

/// Aggregate counts for one concurrent-mode run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrentStats {
    pub submitted: u64,
    pub processed: u64,
    pub failed: u64,
}

/// How often the collector logs progress (spec §4.3: "every 1,000 items").
const PROGRESS_STRIDE: u64 = 1000;

pub struct ConcurrentProcessor;

impl ConcurrentProcessor {
    /// Fans `records` out across `concurrency` worker tasks, transforming
    /// each with `transformer` and writing successes to `writer`. Never
    /// holds more than `config.batch_size + concurrency*2` items live
    /// (spec §4.3's memory discipline).
    pub async fn process<I, O, S>(
        records: S,
        transformer: Arc<dyn ItemTransformer<I, O>>,
        writer: Arc<dyn ExportWriter<O>>,
        config: StreamConfig,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Result<ConcurrentStats, XportError>
    where
        I: Send + 'static,
        O: ExportRecord,
        S: Stream<Item = I> + Send + Unpin + 'static,
    {
        let concurrency = concurrency.max(1);
        let (job_tx, job_rx) = mpsc::channel::<(u64, I)>(concurrency * 2);
        let (result_tx, result_rx) = mpsc::channel::<ProcessResult<O>>(config.batch_size.max(1));

        let submitted = Arc::new(AtomicU64::new(0));
        let decoder_cancel = cancel.clone();
        let decoder_submitted = submitted.clone();
        let decoder = tokio::spawn(async move {
            let mut records = records;
            let mut index = 0u64;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = decoder_cancel.cancelled() => None,
                    item = records.next() => item,
                };
                let Some(item) = next else { break };
                if job_tx.send((index, item)).await.is_err() {
                    break;
                }
                decoder_submitted.fetch_add(1, Ordering::Relaxed);
                index += 1;
            }
        });

        let job_rx = Arc::new(AsyncMutex::new(job_rx));
        let mut worker_handles = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let transformer = transformer.clone();
            let cancel = cancel.clone();
            worker_handles.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let next = { job_rx.lock().await.recv().await };
                    let Some((index, item)) = next else { break };
                    let outcome = transformer.transform(item).await;
                    if result_tx.send(ProcessResult { index, outcome }).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let collector = tokio::spawn(collect(result_rx, writer, config));

        decoder.await.map_err(|e| {
            XportError::new(xport_core::ErrorKind::ProcessingFailed, "decoder task panicked")
                .with_cause(e)
        })?;
        for handle in worker_handles {
            handle.await.map_err(|e| {
                XportError::new(xport_core::ErrorKind::ProcessingFailed, "worker task panicked")
                    .with_cause(e)
            })?;
        }

        let mut stats = collector.await.map_err(|e| {
            XportError::new(xport_core::ErrorKind::ProcessingFailed, "collector task panicked")
                .with_cause(e)
        })?;
        stats.submitted = submitted.load(Ordering::Relaxed);
        Ok(stats)
    }
}

async fn collect<O: ExportRecord>(
    mut result_rx: mpsc::Receiver<ProcessResult<O>>,
    writer: Arc<dyn ExportWriter<O>>,
    config: StreamConfig,
) -> ConcurrentStats {
    let mut stats = ConcurrentStats::default();
    while let Some(result) = result_rx.recv().await {
        match result.outcome {
            Ok(record) => {
                stats.processed += 1;
                if let Err(e) = writer.write(&record) {
                    tracing::warn!(index = result.index, error = %e, "failed to write transformed record");
                    stats.failed += 1;
                    stats.processed -= 1;
                }
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(index = result.index, error = %e, "item transform failed");
            }
        }
        let total = stats.processed + stats.failed;
        if total % PROGRESS_STRIDE == 0 {
            tracing::info!(processed = stats.processed, failed = stats.failed, "stream progress");
            config.run_gc_hook();
        }
    }
    let _ = writer.flush();
    stats
}

#[cfg(test)]
#[path = "concurrent_tests.rs"]
mod tests;
