// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of error kinds shared by every crate in the workspace.
//!
//! Callers compare on [`ErrorKind`], never on the formatted message — the
//! message is for humans and logs only.

use std::time::Duration;

/// A closed set of error kinds. Every fallible operation in the workspace
/// surfaces one of these, optionally wrapped with a cause and retry hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    AuthRequired,
    ReauthRequired,
    RateLimited,
    /// Retryable: the caller should try again, possibly after a delay.
    Transient,
    Upstream5xx,
    Upstream4xx,
    CircuitOpen,
    PoolFull,
    Cancelled,
    Timeout,
    Filesystem,
    DataCorrupted,
    DataMissing,
    ProcessingFailed,
    SecurityViolation,
    ConfigError,
}

crate::simple_display! {
    ErrorKind {
        InvalidInput => "invalid_input",
        AuthRequired => "auth_required",
        ReauthRequired => "reauth_required",
        RateLimited => "rate_limited",
        Transient => "transient",
        Upstream5xx => "upstream_5xx",
        Upstream4xx => "upstream_4xx",
        CircuitOpen => "circuit_open",
        PoolFull => "pool_full",
        Cancelled => "cancelled",
        Timeout => "timeout",
        Filesystem => "filesystem",
        DataCorrupted => "data_corrupted",
        DataMissing => "data_missing",
        ProcessingFailed => "processing_failed",
        SecurityViolation => "security_violation",
        ConfigError => "config_error",
    }
}

impl ErrorKind {
    /// Whether the HTTP client discipline should retry a request that
    /// failed with this kind (spec: retries apply to idempotent requests,
    /// or requests that failed before any bytes were written).
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient | ErrorKind::Upstream5xx | ErrorKind::RateLimited)
    }
}

/// A tagged error carrying a [`ErrorKind`], a human message, an optional
/// cause chain, and an optional retry-after hint (e.g. from `Retry-After`).
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct XportError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    retry_after: Option<Duration>,
}

impl XportError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), cause: None, retry_after: None }
    }

    pub fn with_cause(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_retry_after(mut self, d: Duration) -> Self {
        self.retry_after = Some(d);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled")
    }

    pub fn pool_full() -> Self {
        Self::new(ErrorKind::PoolFull, "worker pool queue is full")
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
