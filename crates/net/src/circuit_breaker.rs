// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-host circuit breaker (spec §4.6): opens after `N` consecutive
//! failures, fails fast for `cool_off`, then allows exactly one trial call.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use xport_core::{ErrorKind, XportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    /// A single trial call has been dispatched; further calls are
    /// refused until it resolves.
    HalfOpen,
}

struct HostState {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    cool_off: Duration,
    hosts: Mutex<HashMap<String, HostState>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cool_off: Duration) -> Self {
        Self { failure_threshold, cool_off, hosts: Mutex::new(HashMap::new()) }
    }

    /// Call before dispatching a request to `host`. Returns
    /// `ErrorKind::CircuitOpen` while open; transitions a sufficiently
    /// aged-out open breaker into half-open and admits the one trial call.
    pub fn check(&self, host: &str) -> Result<(), XportError> {
        let mut hosts = self.hosts.lock();
        let entry = hosts.entry(host.to_string()).or_insert_with(|| HostState {
            state: State::Closed,
            consecutive_failures: 0,
            opened_at: None,
        });

        match entry.state {
            State::Closed => Ok(()),
            State::HalfOpen => Err(XportError::new(
                ErrorKind::CircuitOpen,
                format!("circuit for '{host}' has a trial call in flight"),
            )),
            State::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cool_off {
                    entry.state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(XportError::new(
                        ErrorKind::CircuitOpen,
                        format!("circuit for '{host}' is open"),
                    )
                    .with_retry_after(self.cool_off.saturating_sub(elapsed)))
                }
            }
        }
    }

    pub fn record_success(&self, host: &str) {
        let mut hosts = self.hosts.lock();
        if let Some(entry) = hosts.get_mut(host) {
            entry.state = State::Closed;
            entry.consecutive_failures = 0;
            entry.opened_at = None;
        }
    }

    pub fn record_failure(&self, host: &str) {
        let mut hosts = self.hosts.lock();
        let entry = hosts.entry(host.to_string()).or_insert_with(|| HostState {
            state: State::Closed,
            consecutive_failures: 0,
            opened_at: None,
        });
        entry.consecutive_failures += 1;
        if entry.state == State::HalfOpen || entry.consecutive_failures >= self.failure_threshold {
            entry.state = State::Open;
            entry.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
#[path = "circuit_breaker_tests.rs"]
mod tests;
