// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xport-net: the rate limiter and HTTP client discipline (spec §4.4,
//! §4.6) — token buckets, retry/backoff, circuit breaking, and the token
//! injection seam that `xport-storage`'s token manager fills in.

pub mod circuit_breaker;
pub mod client;
pub mod rate_limiter;

pub use circuit_breaker::CircuitBreaker;
pub use client::{DisciplinedClient, HttpClientConfig, OAuthTokenSource};
pub use rate_limiter::{BucketConfig, RateLimiter};
