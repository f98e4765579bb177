// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint store (spec §4.5, §8 S3): one immutable file per operation
//! id, text-serialized, expiring after `max_age`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use xport_core::OperationId;
use xport_security::{FileClass, FilesystemGuard};
use xport_core::{ErrorKind, XportError};

/// Default checkpoint lifetime (spec §4.5).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub operation_id: OperationId,
    pub operation_type: String,
    pub timestamp_ms: u64,
    pub progress: f64,
    /// `BTreeMap`, not `HashMap`: key order must be stable across
    /// instances for the save-load-save round-trip to be byte-identical
    /// (spec §8 S3).
    pub state: BTreeMap<String, serde_json::Value>,
    pub next_step: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Checkpoint {
    pub fn new(operation_id: OperationId, operation_type: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            operation_id,
            operation_type: operation_type.into(),
            timestamp_ms,
            progress: 0.0,
            state: BTreeMap::new(),
            next_step: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress.clamp(0.0, 1.0);
        self
    }
}

pub struct CheckpointStore {
    dir: PathBuf,
    guard: FilesystemGuard,
    max_age: Duration,
}

impl CheckpointStore {
    pub fn new(dir: PathBuf, guard: FilesystemGuard) -> Self {
        Self { dir, guard, max_age: DEFAULT_MAX_AGE }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    fn path_for(&self, operation_id: &OperationId) -> PathBuf {
        self.dir.join(format!("checkpoint_{operation_id}.json"))
    }

    pub fn save(&self, ckpt: &Checkpoint) -> Result<(), XportError> {
        self.guard.create_dir_all(&self.dir)?;
        let path = self.path_for(&ckpt.operation_id);
        let bytes = serde_json::to_vec_pretty(ckpt)
            .map_err(|e| XportError::new(ErrorKind::DataCorrupted, "failed to encode checkpoint").with_cause(e))?;
        self.guard.write(&path, &bytes, FileClass::Credential)
    }

    /// `load(opId) -> Checkpoint | ErrMissing | ErrExpired`. An expired
    /// file is eagerly deleted on this first access (spec §4.5).
    pub fn load(&self, operation_id: &OperationId) -> Result<Checkpoint, XportError> {
        let path = self.path_for(operation_id);
        if is_expired(&path, self.max_age) {
            let _ = self.guard.remove(&path);
            return Err(XportError::new(ErrorKind::DataMissing, "checkpoint expired"));
        }

        let bytes = match self.guard.read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::Filesystem => {
                return Err(XportError::new(ErrorKind::DataMissing, "checkpoint not found"))
            }
            Err(e) => return Err(e),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| XportError::new(ErrorKind::DataCorrupted, "checkpoint file is corrupted").with_cause(e))
    }

    pub fn delete(&self, operation_id: &OperationId) -> Result<(), XportError> {
        self.guard.remove(&self.path_for(operation_id))
    }

    /// `list() -> [Checkpoint]`. Corrupted or expired files are skipped,
    /// not removed — removal happens in `cleanup` (spec §4.5).
    pub fn list(&self) -> Result<Vec<Checkpoint>, XportError> {
        let mut out = Vec::new();
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Ok(out);
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if is_expired(&path, self.max_age) {
                continue;
            }
            let Ok(bytes) = self.guard.read(&path) else { continue };
            if let Ok(ckpt) = serde_json::from_slice::<Checkpoint>(&bytes) {
                out.push(ckpt);
            }
        }
        Ok(out)
    }

    /// Eagerly removes corrupted and expired files (spec §4.5).
    pub fn cleanup(&self) -> Result<usize, XportError> {
        let mut removed = 0;
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Ok(removed);
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let expired = is_expired(&path, self.max_age);
            let corrupted = self
                .guard
                .read(&path)
                .is_ok_and(|bytes| serde_json::from_slice::<Checkpoint>(&bytes).is_err());
            if expired || corrupted {
                if self.guard.remove(&path).is_ok() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn is_expired(path: &Path, max_age: Duration) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|modified| modified.elapsed().unwrap_or_default() > max_age)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
