// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch-mode stream processing (spec §4.3): accumulate into buffers of
//! `batchSize`, invoke a batch handler once full, write each record to the
//! sink, flush a partial batch at end-of-input.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use xport_core::{ExportRecord, ExportWriter, XportError};

use crate::config::StreamConfig;

/// Invoked once per full (or final partial) batch. A handler failure
/// surfaces to the caller and terminates processing (spec §4.3).
#[async_trait]
pub trait BatchHandler<R: ExportRecord>: Send + Sync {
    async fn handle_batch(&self, batch: &[R]) -> Result<(), XportError>;
}

/// Number of records successfully written to the sink.
pub struct BatchProcessor;

impl BatchProcessor {
    /// Drains `records` into buffers of `config.batch_size`, calling
    /// `handler` once per full batch and once more for a trailing partial
    /// batch, writing every record to `writer` in between.
    pub async fn process<R, S>(
        records: S,
        handler: &dyn BatchHandler<R>,
        writer: &dyn ExportWriter<R>,
        config: &StreamConfig,
    ) -> Result<usize, XportError>
    where
        R: ExportRecord,
        S: Stream<Item = R> + Unpin,
    {
        let mut records = records;
        let mut batch: Vec<R> = Vec::with_capacity(config.batch_size);
        let mut written = 0usize;

        while let Some(record) = records.next().await {
            batch.push(record);
            if batch.len() >= config.batch_size {
                written += flush_batch(&mut batch, handler, writer).await?;
                config.run_gc_hook();
            }
        }

        if !batch.is_empty() {
            written += flush_batch(&mut batch, handler, writer).await?;
        }

        writer.flush()?;
        Ok(written)
    }
}

async fn flush_batch<R: ExportRecord>(
    batch: &mut Vec<R>,
    handler: &dyn BatchHandler<R>,
    writer: &dyn ExportWriter<R>,
) -> Result<usize, XportError> {
    handler.handle_batch(batch).await?;
    for record in batch.iter() {
        writer.write(record)?;
    }
    let written = batch.len();
    batch.clear();
    Ok(written)
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
