// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyring backends for secret storage (spec §4.10).
//!
//! Three backends implement the same trait: the OS secret store (via the
//! `keyring` crate), an environment-variable store (for containers/CI where
//! no OS keyring exists), and an AEAD-encrypted file store whose key is
//! itself sourced from the environment or generated on first use.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use xport_core::{ErrorKind, XportError};

use crate::fs_guard::{FileClass, FilesystemGuard};

/// Common contract for every keyring backend.
pub trait KeyringBackend: Send + Sync {
    fn store(&self, key: &str, value: &str) -> Result<(), XportError>;
    fn retrieve(&self, key: &str) -> Result<String, XportError>;
    fn destroy(&self, key: &str) -> Result<(), XportError>;
}

/// A service name under which all secrets are namespaced in the OS keyring.
const SERVICE: &str = "xport";

/// OS secret store backend (macOS Keychain / Windows Credential Manager /
/// Linux Secret Service), via the `keyring` crate.
pub struct OsKeyringBackend;

impl KeyringBackend for OsKeyringBackend {
    fn store(&self, key: &str, value: &str) -> Result<(), XportError> {
        let entry = keyring::Entry::new(SERVICE, key)
            .map_err(|e| XportError::new(ErrorKind::Filesystem, "keyring entry failed").with_cause(e))?;
        entry
            .set_password(value)
            .map_err(|e| XportError::new(ErrorKind::Filesystem, "keyring store failed").with_cause(e))
    }

    fn retrieve(&self, key: &str) -> Result<String, XportError> {
        let entry = keyring::Entry::new(SERVICE, key)
            .map_err(|e| XportError::new(ErrorKind::Filesystem, "keyring entry failed").with_cause(e))?;
        entry.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => XportError::new(ErrorKind::DataMissing, "no such secret"),
            other => XportError::new(ErrorKind::Filesystem, "keyring retrieve failed").with_cause(other),
        })
    }

    fn destroy(&self, key: &str) -> Result<(), XportError> {
        let entry = keyring::Entry::new(SERVICE, key)
            .map_err(|e| XportError::new(ErrorKind::Filesystem, "keyring entry failed").with_cause(e))?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(XportError::new(ErrorKind::Filesystem, "keyring destroy failed").with_cause(e)),
        }
    }
}

/// Environment-variable backend: `key` is upper-cased and prefixed with
/// `XPORT_SECRET_`. Intended for containers/CI where no OS keyring exists.
/// `store`/`destroy` only affect the in-process cache — environment
/// variables of a running process cannot be durably rewritten — so this
/// backend is most useful as a read-through over operator-provided env vars.
pub struct EnvKeyringBackend {
    overrides: Mutex<HashMap<String, String>>,
}

impl EnvKeyringBackend {
    pub fn new() -> Self {
        Self { overrides: Mutex::new(HashMap::new()) }
    }

    fn env_name(key: &str) -> String {
        format!("XPORT_SECRET_{}", key.to_ascii_uppercase().replace(['-', ' '], "_"))
    }
}

impl Default for EnvKeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringBackend for EnvKeyringBackend {
    fn store(&self, key: &str, value: &str) -> Result<(), XportError> {
        self.overrides.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String, XportError> {
        if let Some(v) = self.overrides.lock().get(key).cloned() {
            return Ok(v);
        }
        std::env::var(Self::env_name(key))
            .map_err(|_| XportError::new(ErrorKind::DataMissing, "no such secret in environment"))
    }

    fn destroy(&self, key: &str) -> Result<(), XportError> {
        self.overrides.lock().remove(key);
        Ok(())
    }
}

/// AEAD-encrypted file store. Each secret is a separate file
/// `<dir>/<key>.enc` containing a random 12-byte nonce followed by the
/// AES-256-GCM ciphertext. The encryption key itself comes from
/// `ENCRYPTION_KEY` (hex-encoded, 32 bytes) or is generated at first use and
/// persisted (mode `0600`) alongside the secrets.
pub struct EncryptedFileKeyringBackend {
    dir: PathBuf,
    guard: FilesystemGuard,
    cipher: Aes256Gcm,
}

impl EncryptedFileKeyringBackend {
    pub fn open(dir: PathBuf, guard: FilesystemGuard) -> Result<Self, XportError> {
        guard.create_dir_all(&dir)?;
        let key_bytes = load_or_create_key(&dir, &guard)?;
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        let cipher = Aes256Gcm::new(key);
        Ok(Self { dir, guard, cipher })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.enc"))
    }
}

fn load_or_create_key(dir: &Path, guard: &FilesystemGuard) -> Result<[u8; 32], XportError> {
    if let Ok(hex_key) = std::env::var("ENCRYPTION_KEY") {
        return decode_hex_key(&hex_key);
    }
    let key_path = dir.join("keyring.key");
    if let Ok(existing) = guard.read(&key_path) {
        return decode_hex_key(&String::from_utf8_lossy(&existing));
    }
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    guard.write(&key_path, hex_encode(&key).as_bytes(), FileClass::Credential)?;
    Ok(key)
}

fn decode_hex_key(hex: &str) -> Result<[u8; 32], XportError> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(XportError::new(ErrorKind::ConfigError, "ENCRYPTION_KEY must be 64 hex chars"));
    }
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| XportError::new(ErrorKind::ConfigError, "ENCRYPTION_KEY is not valid hex"))?;
    }
    Ok(out)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl KeyringBackend for EncryptedFileKeyringBackend {
    fn store(&self, key: &str, value: &str) -> Result<(), XportError> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, value.as_bytes())
            .map_err(|_| XportError::new(ErrorKind::SecurityViolation, "encryption failed"))?;
        let mut payload = nonce_bytes.to_vec();
        payload.extend_from_slice(&ciphertext);
        self.guard.write(&self.path_for(key), &payload, FileClass::Credential)
    }

    fn retrieve(&self, key: &str) -> Result<String, XportError> {
        let payload = self
            .guard
            .read(&self.path_for(key))
            .map_err(|e| XportError::new(ErrorKind::DataMissing, "no such secret").with_cause(e))?;
        if payload.len() < 12 {
            return Err(XportError::new(ErrorKind::DataCorrupted, "secret file truncated"));
        }
        let (nonce_bytes, ciphertext) = payload.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| XportError::new(ErrorKind::DataCorrupted, "decryption failed"))?;
        String::from_utf8(plaintext)
            .map_err(|_| XportError::new(ErrorKind::DataCorrupted, "secret is not valid utf-8"))
    }

    fn destroy(&self, key: &str) -> Result<(), XportError> {
        self.guard.remove(&self.path_for(key))
    }
}

#[cfg(test)]
#[path = "keyring_tests.rs"]
mod tests;
