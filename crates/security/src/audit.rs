// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, file-backed audit log (spec §4.10, §6).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use xport_core::{ErrorKind, XportError};

use crate::fs_guard::{FileClass, FilesystemGuard};
use crate::validation::sanitize_for_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// An immutable audit record. Sensitive fields in `details`/`message` are
/// redacted at construction time unless `include_sensitive` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp_ms: u64,
    pub event_type: String,
    pub severity: Severity,
    pub source: String,
    pub action: String,
    pub target: Option<String>,
    pub result: String,
    pub message: String,
    pub details: serde_json::Value,
    pub remote_addr: Option<String>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
}

impl AuditEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp_ms: u64,
        event_type: impl Into<String>,
        severity: Severity,
        source: impl Into<String>,
        action: impl Into<String>,
        result: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_ms,
            event_type: event_type.into(),
            severity,
            source: source.into(),
            action: action.into(),
            target: None,
            result: result.into(),
            message: message.into(),
            details: serde_json::Value::Null,
            remote_addr: None,
            user_id: None,
            request_id: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Redact `message` in place unless `include_sensitive` is true.
    fn sanitized(mut self, include_sensitive: bool) -> Self {
        if !include_sensitive {
            self.message = sanitize_for_log(&self.message);
        }
        self
    }
}

/// Append-only JSON-lines audit log with age-based rotation.
pub struct AuditLog {
    path: PathBuf,
    guard: FilesystemGuard,
    include_sensitive: bool,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: PathBuf, guard: FilesystemGuard, include_sensitive: bool) -> Self {
        Self { path, guard, include_sensitive, write_lock: Mutex::new(()) }
    }

    /// Append one event, sanitizing it first unless configured otherwise.
    pub fn record(&self, event: AuditEvent) -> Result<(), XportError> {
        let event = event.sanitized(self.include_sensitive);
        let mut line = serde_json::to_string(&event)
            .map_err(|e| XportError::new(ErrorKind::DataCorrupted, "failed to encode audit event").with_cause(e))?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        self.guard.validate(&self.path)?;
        if let Some(parent) = self.path.parent() {
            self.guard.create_dir_all(parent)?;
        }
        let mut existing = self.guard.read(&self.path).unwrap_or_default();
        existing.extend_from_slice(line.as_bytes());
        self.guard.write(&self.path, &existing, FileClass::Data)
    }

    /// Read all well-formed events currently on disk. Corrupted lines are
    /// silently skipped (the guard's `cleanup` removes a wholly corrupted
    /// file; a partially corrupted file just loses those lines here).
    pub fn read_all(&self) -> Result<Vec<AuditEvent>, XportError> {
        let bytes = match self.guard.read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::Filesystem => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.lines().filter_map(|line| serde_json::from_str(line).ok()).collect())
    }

    /// Remove the log file if it is older than `max_age` or fails to parse
    /// as JSON-lines at all (spec §4.10: "corrupted and expired files
    /// removed during cleanup").
    pub fn cleanup(&self, max_age: Duration) -> Result<bool, XportError> {
        let Ok(meta) = std::fs::metadata(&self.path) else { return Ok(false) };
        let Ok(modified) = meta.modified() else { return Ok(false) };
        let aged_out = modified.elapsed().unwrap_or_default() > max_age;
        let corrupted = self.guard.read(&self.path).is_ok_and(|bytes| {
            let text = String::from_utf8_lossy(&bytes);
            !text.lines().all(|line| serde_json::from_str::<AuditEvent>(line).is_ok())
        });
        if aged_out || corrupted {
            self.guard.remove(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

pub fn path_traversal_event(timestamp_ms: u64, path: &Path) -> AuditEvent {
    AuditEvent::new(
        timestamp_ms,
        "security_violation",
        Severity::High,
        "filesystem_security",
        "validate_path",
        "rejected",
        format!("rejected path traversal attempt: {}", path.display()),
    )
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
