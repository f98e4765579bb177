// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn allows_up_to_capacity_then_refuses() {
    let limiter = RateLimiter::new(true, BucketConfig { capacity: 2.0, refill_rate: 0.0 });
    assert!(limiter.allow("trakt"));
    assert!(limiter.allow("trakt"));
    assert!(!limiter.allow("trakt"));
}

#[test]
fn disabled_limiter_always_allows() {
    let limiter = RateLimiter::new(false, BucketConfig { capacity: 1.0, refill_rate: 0.0 });
    for _ in 0..100 {
        assert!(limiter.allow("trakt"));
    }
}

#[test]
fn allow_n_consumes_multiple_tokens() {
    let limiter = RateLimiter::new(true, BucketConfig { capacity: 5.0, refill_rate: 0.0 });
    assert!(limiter.allow_n("trakt", 3.0));
    assert!(!limiter.allow_n("trakt", 3.0));
    assert!(limiter.allow_n("trakt", 2.0));
}

#[test]
fn buckets_refill_over_time() {
    let limiter = RateLimiter::new(true, BucketConfig { capacity: 1.0, refill_rate: 1000.0 });
    assert!(limiter.allow("trakt"));
    assert!(!limiter.allow("trakt"));
    std::thread::sleep(Duration::from_millis(5));
    assert!(limiter.allow("trakt"));
}

#[tokio::test]
async fn wait_resolves_once_a_token_refills() {
    let limiter = RateLimiter::new(true, BucketConfig { capacity: 1.0, refill_rate: 100.0 });
    assert!(limiter.allow("trakt"));
    let result = tokio::time::timeout(
        Duration::from_secs(1),
        limiter.wait("trakt", std::future::pending()),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn wait_respects_cancellation() {
    let limiter = RateLimiter::new(true, BucketConfig { capacity: 1.0, refill_rate: 0.0 });
    assert!(limiter.allow("trakt"));
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tx.send(()).unwrap();
    let cancel = async move {
        let _ = rx.await;
    };
    let result = limiter.wait("trakt", cancel).await;
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind(), xport_core::ErrorKind::Cancelled);
}

#[test]
fn per_service_overrides_apply_independently_of_the_default() {
    let limiter = RateLimiter::new(true, BucketConfig { capacity: 1.0, refill_rate: 0.0 })
        .with_service_limit("trakt", BucketConfig { capacity: 5.0, refill_rate: 0.0 });

    // "trakt" gets the override's larger capacity...
    for _ in 0..5 {
        assert!(limiter.allow("trakt"));
    }
    assert!(!limiter.allow("trakt"));

    // ...while an unnamed service still gets the default's capacity of 1.
    assert!(limiter.allow("letterboxd"));
    assert!(!limiter.allow("letterboxd"));
}

#[test]
fn refusal_is_audited_at_most_once_per_minute() {
    let dir = tempfile::tempdir().unwrap();
    let guard = xport_security::FilesystemGuard::new(vec![dir.path().to_path_buf()]);
    let audit = std::sync::Arc::new(xport_security::AuditLog::new(
        dir.path().join("audit.log"),
        guard,
        true,
    ));
    let limiter = RateLimiter::new(true, BucketConfig { capacity: 1.0, refill_rate: 0.0 })
        .with_audit_log(audit.clone());
    assert!(limiter.allow("trakt"));
    assert!(!limiter.allow("trakt"));
    assert!(!limiter.allow("trakt"));
    let events = audit.read_all().unwrap();
    assert_eq!(events.len(), 1);
}
