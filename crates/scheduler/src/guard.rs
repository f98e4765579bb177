// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! At-most-one-concurrent-run-per-`(operationType, scope)` guard (spec
//! §4.1): overlapping ticks are skipped and counted, never queued.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use xport_core::ExportScope;

type Key = (String, ExportScope);

#[derive(Clone)]
pub struct ConcurrencyGuard {
    running: Arc<Mutex<HashSet<Key>>>,
    skipped: Arc<AtomicU64>,
}

/// Held for the lifetime of one run; releases its `(operationType,
/// scope)` slot on drop so a panic mid-run can't wedge future ticks out.
pub struct RunToken {
    key: Key,
    running: Arc<Mutex<HashSet<Key>>>,
}

impl Drop for RunToken {
    fn drop(&mut self) {
        self.running.lock().remove(&self.key);
    }
}

impl Default for ConcurrencyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self { running: Arc::new(Mutex::new(HashSet::new())), skipped: Arc::new(AtomicU64::new(0)) }
    }

    /// Returns `None`, and records the skip, if a run for this
    /// `(operation_type, scope)` is already in flight.
    pub fn try_acquire(&self, operation_type: &str, scope: ExportScope) -> Option<RunToken> {
        let key = (operation_type.to_string(), scope);
        let mut running = self.running.lock();
        if !running.insert(key.clone()) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(RunToken { key, running: self.running.clone() })
    }

    pub fn skipped_count(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
