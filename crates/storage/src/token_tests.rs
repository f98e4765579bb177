// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use xport_core::FakeClock;

use super::*;

struct StubRefresher {
    calls: Arc<AtomicU32>,
    next_expires_at_ms: u64,
    fail_with: Option<RefreshError>,
}

#[async_trait]
impl TokenRefresher for StubRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<Token, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(Token {
            access_token: format!("fresh-for-{refresh_token}"),
            refresh_token: refresh_token.to_string(),
            expires_at_ms: self.next_expires_at_ms,
            scope: "default".to_string(),
        })
    }
}

fn guard(dir: &std::path::Path) -> FilesystemGuard {
    FilesystemGuard::new(vec![dir.to_path_buf()])
}

#[tokio::test]
async fn returns_seeded_token_when_not_near_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let refresher = StubRefresher { calls: Arc::new(AtomicU32::new(0)), next_expires_at_ms: 0, fail_with: None };
    let calls = refresher.calls.clone();
    let manager = TokenManager::new(
        dir.path().join("token.json"),
        guard(dir.path()),
        Box::new(refresher),
        clock,
    );
    manager.seed(Token {
        access_token: "still-good".to_string(),
        refresh_token: "r1".to_string(),
        expires_at_ms: 1_000_000 + Duration::from_secs(3600).as_millis() as u64,
        scope: "default".to_string(),
    });

    let token = manager.get_valid().await.unwrap();
    assert_eq!(token.access_token, "still-good");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn refreshes_when_within_skew_of_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let refresher = StubRefresher {
        calls: Arc::new(AtomicU32::new(0)),
        next_expires_at_ms: 2_000_000,
        fail_with: None,
    };
    let calls = refresher.calls.clone();
    let manager = TokenManager::new(
        dir.path().join("token.json"),
        guard(dir.path()),
        Box::new(refresher),
        clock,
    );
    manager.seed(Token {
        access_token: "about-to-expire".to_string(),
        refresh_token: "r1".to_string(),
        expires_at_ms: 1_000_030,
        scope: "default".to_string(),
    });

    let token = manager.get_valid().await.unwrap();
    assert_eq!(token.access_token, "fresh-for-r1");
    assert_eq!(token.expires_at_ms, 2_000_000);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_callers_trigger_a_single_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let refresher = StubRefresher {
        calls: Arc::new(AtomicU32::new(0)),
        next_expires_at_ms: 2_000_000,
        fail_with: None,
    };
    let calls = refresher.calls.clone();
    let manager = Arc::new(TokenManager::new(
        dir.path().join("token.json"),
        guard(dir.path()),
        Box::new(refresher),
        clock,
    ));
    manager.seed(Token {
        access_token: "expired".to_string(),
        refresh_token: "r1".to_string(),
        expires_at_ms: 0,
        scope: "default".to_string(),
    });

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move { manager.get_valid().await.unwrap() }));
    }
    for h in handles {
        let token = h.await.unwrap();
        assert_eq!(token.access_token, "fresh-for-r1");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn terminal_refresh_failure_clears_state_and_reports_reauth_required() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let refresher = StubRefresher {
        calls: Arc::new(AtomicU32::new(0)),
        next_expires_at_ms: 0,
        fail_with: Some(RefreshError::invalid_grant("token revoked")),
    };
    let manager = TokenManager::new(
        dir.path().join("token.json"),
        guard(dir.path()),
        Box::new(refresher),
        clock,
    );
    manager.seed(Token {
        access_token: "expired".to_string(),
        refresh_token: "r1".to_string(),
        expires_at_ms: 0,
        scope: "default".to_string(),
    });

    let err = manager.get_valid().await.unwrap_err();
    assert_eq!(err.kind(), xport_core::ErrorKind::ReauthRequired);
    assert!(!dir.path().join("token.json").exists());
}

#[tokio::test]
async fn transient_refresh_failure_surfaces_as_transient() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let refresher = StubRefresher {
        calls: Arc::new(AtomicU32::new(0)),
        next_expires_at_ms: 0,
        fail_with: Some(RefreshError::transient("upstream hiccup")),
    };
    let manager = TokenManager::new(
        dir.path().join("token.json"),
        guard(dir.path()),
        Box::new(refresher),
        clock,
    );
    manager.seed(Token {
        access_token: "expired".to_string(),
        refresh_token: "r1".to_string(),
        expires_at_ms: 0,
        scope: "default".to_string(),
    });

    let err = manager.get_valid().await.unwrap_err();
    assert_eq!(err.kind(), xport_core::ErrorKind::Transient);
}

#[tokio::test]
async fn persists_refreshed_token_through_the_filesystem_guard() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let path = dir.path().join("token.json");
    let refresher = StubRefresher {
        calls: Arc::new(AtomicU32::new(0)),
        next_expires_at_ms: 2_000_000,
        fail_with: None,
    };
    let manager = TokenManager::new(path.clone(), guard(dir.path()), Box::new(refresher), clock);
    manager.seed(Token {
        access_token: "expired".to_string(),
        refresh_token: "r1".to_string(),
        expires_at_ms: 0,
        scope: "default".to_string(),
    });

    manager.get_valid().await.unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let persisted: Token = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(persisted.access_token, "fresh-for-r1");
}
