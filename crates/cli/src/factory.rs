// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam a real Trakt-fetching implementation plugs into. The concrete
//! wire format of the upstream API is a named external collaborator
//! (spec.md §1); this binary wires the rest of the runtime around whatever
//! [`JobFactory`] is supplied, defaulting to one that submits no jobs.

use std::sync::Arc;

use async_trait::async_trait;

use xport_core::{Job, XportError};
use xport_scheduler::{ExportRequest, JobFactory};

/// Decomposes every export request into zero jobs. Useful for exercising
/// the scheduler/pool/hub wiring end to end without a concrete upstream
/// client; a deployment supplies its own [`JobFactory`] in its place.
pub struct NullJobFactory;

#[async_trait]
impl JobFactory for NullJobFactory {
    async fn jobs_for(&self, _request: &ExportRequest) -> Result<Vec<Arc<dyn Job>>, XportError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
