// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path validation and guarded filesystem writes.
//!
//! Every write performed by the checkpoint store, token manager, audit log,
//! and keyring file backend goes through this guard (spec §4.10).

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use xport_core::{ErrorKind, XportError};

use crate::audit::{path_traversal_event, AuditLog};

/// Default cap on a single guarded write (spec §4.10: `maxFileSize`).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Mode bits applied to files and directories the guard creates.
#[derive(Debug, Clone, Copy)]
pub enum FileClass {
    /// Credential files: `0600`.
    Credential,
    /// Ordinary data files: `0644`.
    Data,
}

impl FileClass {
    fn mode(self) -> u32 {
        match self {
            FileClass::Credential => 0o600,
            FileClass::Data => 0o644,
        }
    }
}

/// Mode applied to directories the guard creates: `0750`.
const DIR_MODE: u32 = 0o750;

/// Validates paths against an allowlist of base directories and a denylist
/// of system paths, and performs mode-enforced writes.
#[derive(Debug, Clone)]
pub struct FilesystemGuard {
    allowlist: Vec<PathBuf>,
    denylist: Vec<PathBuf>,
    max_file_size: u64,
    /// Records a `path_traversal_event` whenever `validate` rejects a `..`
    /// component (spec §8 S6). Left unset for the guard `AuditLog` itself
    /// uses for its own I/O, to avoid auditing the audit log.
    audit: Option<Arc<AuditLog>>,
}

impl FilesystemGuard {
    pub fn new(allowlist: Vec<PathBuf>) -> Self {
        Self {
            allowlist,
            denylist: default_denylist(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            audit: None,
        }
    }

    pub fn with_denylist(mut self, denylist: Vec<PathBuf>) -> Self {
        self.denylist = denylist;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Validate `path`: reject any input containing a literal `..`
    /// component, reject anything under a denylisted prefix, resolve each
    /// component and reject if it (or a symlink it passes through) escapes
    /// the allowlist (spec §8 S6).
    pub fn validate(&self, path: &Path) -> Result<PathBuf, XportError> {
        if path.components().any(|c| c == Component::ParentDir) {
            if let Some(audit) = &self.audit {
                let _ = audit.record(path_traversal_event(unix_ms_now(), path));
            }
            return Err(XportError::new(
                ErrorKind::SecurityViolation,
                format!("path contains a parent-directory traversal: {}", path.display()),
            ));
        }

        for denied in &self.denylist {
            if path.starts_with(denied) {
                return Err(XportError::new(
                    ErrorKind::SecurityViolation,
                    format!("path falls under a denylisted prefix: {}", path.display()),
                ));
            }
        }

        let resolved = self.resolve_within_allowlist(path)?;
        Ok(resolved)
    }

    /// Resolve `path` component-by-component, following symlinks, and
    /// confirm the fully-resolved target still lives under one of the
    /// allowlisted base directories.
    fn resolve_within_allowlist(&self, path: &Path) -> Result<PathBuf, XportError> {
        let in_allowlist = self.allowlist.iter().any(|base| path.starts_with(base));
        if !in_allowlist {
            return Err(XportError::new(
                ErrorKind::SecurityViolation,
                format!("path is outside every allowlisted directory: {}", path.display()),
            ));
        }

        // Walk existing ancestors to detect a symlink that escapes the
        // allowlist; the final (possibly not-yet-existing) component is
        // exempt since writes create it fresh.
        let mut probe = PathBuf::new();
        let mut components: Vec<_> = path.components().collect();
        let last = components.pop();
        for component in components {
            probe.push(component);
            if let Ok(meta) = std::fs::symlink_metadata(&probe) {
                if meta.file_type().is_symlink() {
                    let target = std::fs::canonicalize(&probe).map_err(|e| {
                        XportError::new(ErrorKind::Filesystem, "failed to resolve symlink")
                            .with_cause(e)
                    })?;
                    let escapes = !self.allowlist.iter().any(|base| target.starts_with(base));
                    if escapes {
                        return Err(XportError::new(
                            ErrorKind::SecurityViolation,
                            format!("symlink escapes allowlist: {}", probe.display()),
                        ));
                    }
                }
            }
        }
        if let Some(last) = last {
            probe.push(last);
        }
        Ok(probe)
    }

    /// Write `contents` to `path`, after validation, enforcing the size cap
    /// and applying the mode for `class`.
    pub fn write(&self, path: &Path, contents: &[u8], class: FileClass) -> Result<(), XportError> {
        if contents.len() as u64 > self.max_file_size {
            return Err(XportError::new(
                ErrorKind::SecurityViolation,
                format!(
                    "write of {} bytes exceeds max_file_size {} bytes",
                    contents.len(),
                    self.max_file_size
                ),
            ));
        }
        let target = self.validate(path)?;
        if let Some(parent) = target.parent() {
            self.create_dir_all(parent)?;
        }
        std::fs::write(&target, contents)
            .map_err(|e| XportError::new(ErrorKind::Filesystem, "write failed").with_cause(e))?;
        set_mode(&target, class.mode());
        Ok(())
    }

    /// Create `dir` (and parents) after validation, applying `0750`.
    pub fn create_dir_all(&self, dir: &Path) -> Result<(), XportError> {
        let target = self.validate(dir)?;
        std::fs::create_dir_all(&target)
            .map_err(|e| XportError::new(ErrorKind::Filesystem, "mkdir failed").with_cause(e))?;
        set_mode(&target, DIR_MODE);
        Ok(())
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>, XportError> {
        let target = self.validate(path)?;
        std::fs::read(&target)
            .map_err(|e| XportError::new(ErrorKind::Filesystem, "read failed").with_cause(e))
    }

    pub fn remove(&self, path: &Path) -> Result<(), XportError> {
        let target = self.validate(path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(XportError::new(ErrorKind::Filesystem, "remove failed").with_cause(e)),
        }
    }

    /// Remove temp files (matched by `prefix`) under `dir` older than `max_age`.
    pub fn cleanup_temp_files(
        &self,
        dir: &Path,
        prefix: &str,
        max_age: Duration,
    ) -> Result<usize, XportError> {
        let target = self.validate(dir)?;
        let entries = match std::fs::read_dir(&target) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(XportError::new(ErrorKind::Filesystem, "readdir failed").with_cause(e))
            }
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(prefix) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            let Ok(modified) = meta.modified() else { continue };
            if SystemTime::now().duration_since(modified).unwrap_or_default() > max_age {
                if std::fs::remove_file(entry.path()).is_ok() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn default_denylist() -> Vec<PathBuf> {
    ["/etc", "/sys", "/proc", "/boot", "/dev"].into_iter().map(PathBuf::from).collect()
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = std::fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(mode);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

#[cfg(test)]
#[path = "fs_guard_tests.rs"]
mod tests;
