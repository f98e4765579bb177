// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared batch/concurrent stream configuration (spec §4.3).

use std::sync::Arc;

/// Default number of records accumulated before a batch handler runs, or
/// the bound on the concurrent mode's result channel.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default buffered-reader / channel buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// `{batchSize, bufferSize}` shared by [`crate::batch::BatchProcessor`]
/// and [`crate::concurrent::ConcurrentProcessor`] (spec §4.3).
#[derive(Clone)]
pub struct StreamConfig {
    pub batch_size: usize,
    pub buffer_size: usize,
    /// The in-source "memory-efficient" mode's GC hook (SPEC_FULL §6,
    /// Open Question 2). Invoked between batches; the default always
    /// returns `false`. Trigger policy (when to call it, what `true`
    /// should cause) is left to the caller.
    pub gc_hook: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            gc_hook: None,
        }
    }
}

impl StreamConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_gc_hook(mut self, hook: Arc<dyn Fn() -> bool + Send + Sync>) -> Self {
        self.gc_hook = Some(hook);
        self
    }

    /// Runs the configured GC hook, or the always-`false` default
    /// (SPEC_FULL §6 Open Question 2).
    pub fn run_gc_hook(&self) -> bool {
        self.gc_hook.as_ref().map(|hook| hook()).unwrap_or(false)
    }
}
