// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xport-pool: the bounded worker pool (spec §4.2, §8 S1) — `W` worker
//! tasks drawing from a `W*2`-capacity bounded queue, non-blocking
//! `submit`, a per-job deadline, and panic-to-`ProcessingFailed`
//! translation at the worker boundary.

pub mod pool;

pub use pool::{JobResultStream, PoolConfig, PoolStats, WorkerPool};
