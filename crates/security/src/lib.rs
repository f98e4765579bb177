// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xport-security: the credential and filesystem security perimeter
//! (spec §4.10) — keyring backends, input validation, the filesystem
//! guard, and the append-only audit log.

pub mod audit;
pub mod fs_guard;
pub mod keyring;
pub mod validation;

pub use audit::{AuditEvent, AuditLog, Severity};
pub use fs_guard::{FileClass, FilesystemGuard};
pub use keyring::{EncryptedFileKeyringBackend, EnvKeyringBackend, KeyringBackend, OsKeyringBackend};
pub use validation::{
    config_value_rule, no_sql_injection, no_xss, path_rule, sanitize_for_log,
    DEFAULT_SENSITIVE_FIELDS,
};
