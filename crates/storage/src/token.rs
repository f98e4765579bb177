// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token manager (spec §4.9, §3 `Token`): a persisted OAuth token with
//! single-flight refresh. Implements `xport_net::OAuthTokenSource` so the
//! HTTP client discipline can inject and refresh tokens without depending
//! on this crate directly.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use xport_core::{ErrorKind, XportError};
use xport_net::OAuthTokenSource;
use xport_security::{FileClass, FilesystemGuard};

/// Default clock skew subtracted from `expires_at` before a token is
/// considered still valid (spec §4.9).
pub const DEFAULT_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_ms: u64,
    pub scope: String,
}

/// Performs the actual OAuth refresh call. A real implementation fills
/// this in with the Trakt/Letterboxd token endpoint; `invalid_grant` is
/// the one terminal error this manager recognizes (spec §4.9).
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Token, RefreshError>;
}

#[derive(Debug, Clone)]
pub struct RefreshError {
    pub terminal: bool,
    pub message: String,
}

impl RefreshError {
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self { terminal: true, message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self { terminal: false, message: message.into() }
    }
}

pub struct TokenManager<C: xport_core::Clock> {
    path: PathBuf,
    guard: FilesystemGuard,
    refresher: Box<dyn TokenRefresher>,
    clock: C,
    skew: Duration,
    current: RwLock<Option<Token>>,
    refresh_lock: AsyncMutex<()>,
}

impl<C: xport_core::Clock + 'static> TokenManager<C> {
    pub fn new(
        path: PathBuf,
        guard: FilesystemGuard,
        refresher: Box<dyn TokenRefresher>,
        clock: C,
    ) -> Self {
        Self {
            path,
            guard,
            refresher,
            clock,
            skew: DEFAULT_SKEW,
            current: RwLock::new(None),
            refresh_lock: AsyncMutex::new(()),
        }
    }

    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    fn load_from_disk(&self) -> Result<Option<Token>, XportError> {
        match self.guard.read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| XportError::new(ErrorKind::DataCorrupted, "token file is corrupted").with_cause(e)),
            Err(e) if e.kind() == ErrorKind::Filesystem => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn persist(&self, token: &Token) -> Result<(), XportError> {
        let bytes = serde_json::to_vec_pretty(token)
            .map_err(|e| XportError::new(ErrorKind::DataCorrupted, "failed to encode token").with_cause(e))?;
        self.guard.write(&self.path, &bytes, FileClass::Credential)
    }

    fn clear_persisted(&self) {
        let _ = self.guard.remove(&self.path);
    }

    fn is_valid(&self, token: &Token) -> bool {
        let now = self.clock.epoch_ms();
        now + self.skew.as_millis() as u64 <= token.expires_at_ms
    }

    /// `getValid()`: returns the current token if not about to expire,
    /// otherwise performs a single-flight refresh (spec §4.9).
    pub async fn get_valid(&self) -> Result<Token, XportError> {
        {
            let current = self.current.read();
            if let Some(token) = current.as_ref() {
                if self.is_valid(token) {
                    return Ok(token.clone());
                }
            }
        }

        if self.current.read().is_none() {
            if let Some(loaded) = self.load_from_disk()? {
                if self.is_valid(&loaded) {
                    *self.current.write() = Some(loaded.clone());
                    return Ok(loaded);
                }
                *self.current.write() = Some(loaded);
            }
        }

        self.refresh().await
    }

    /// Single-flight refresh: concurrent callers block on the same async
    /// mutex and all observe the one refresh's result.
    async fn refresh(&self) -> Result<Token, XportError> {
        let _guard = self.refresh_lock.lock().await;

        // Re-check after acquiring the lock: another caller may have
        // already refreshed while we were waiting.
        if let Some(token) = self.current.read().as_ref() {
            if self.is_valid(token) {
                return Ok(token.clone());
            }
        }

        let refresh_token = self
            .current
            .read()
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .ok_or_else(|| XportError::new(ErrorKind::ReauthRequired, "no refresh token available"))?;

        match self.refresher.refresh(&refresh_token).await {
            Ok(new_token) => {
                self.persist(&new_token)?;
                *self.current.write() = Some(new_token.clone());
                Ok(new_token)
            }
            Err(e) if e.terminal => {
                *self.current.write() = None;
                self.clear_persisted();
                Err(XportError::new(ErrorKind::ReauthRequired, e.message))
            }
            Err(e) => Err(XportError::new(ErrorKind::Transient, e.message)),
        }
    }

    pub fn seed(&self, token: Token) {
        *self.current.write() = Some(token);
    }
}

#[async_trait]
impl<C: xport_core::Clock + 'static> OAuthTokenSource for TokenManager<C> {
    async fn access_token(&self) -> Result<String, XportError> {
        Ok(self.get_valid().await?.access_token)
    }

    async fn refresh(&self) -> Result<String, XportError> {
        Ok(TokenManager::refresh(self).await?.access_token)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
