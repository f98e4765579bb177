// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The export request the scheduler decomposes into jobs (spec overview:
//! "the scheduler produces export requests").

use std::sync::Arc;

use async_trait::async_trait;

use xport_core::{ExportScope, Job, XportError};

/// Fetch depth. `Complete` re-fetches history some normal runs would
/// skip via incremental state (spec §6 `export.mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    Normal,
    Complete,
}

#[derive(Debug, Clone, Copy)]
pub struct ExportRequest {
    pub scope: ExportScope,
    pub mode: ExportMode,
}

impl ExportRequest {
    pub fn new(scope: ExportScope, mode: ExportMode) -> Self {
        Self { scope, mode }
    }
}

/// Decomposes one export request into the jobs submitted to the worker
/// pool (spec overview data-flow). The concrete Trakt-fetching job
/// implementation is outside this workspace's scope (spec.md §1); this
/// trait is the seam a real implementation plugs into.
#[async_trait]
pub trait JobFactory: Send + Sync {
    async fn jobs_for(&self, request: &ExportRequest) -> Result<Vec<Arc<dyn Job>>, XportError>;
}
