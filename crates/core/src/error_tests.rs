// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn retryable_kinds() {
    assert!(ErrorKind::Transient.is_retryable());
    assert!(ErrorKind::Upstream5xx.is_retryable());
    assert!(ErrorKind::RateLimited.is_retryable());
    assert!(!ErrorKind::Upstream4xx.is_retryable());
    assert!(!ErrorKind::InvalidInput.is_retryable());
}

#[test]
fn display_uses_snake_case_code() {
    assert_eq!(ErrorKind::ReauthRequired.to_string(), "reauth_required");
}

#[test]
fn kind_survives_cause_and_retry_after() {
    let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    let err = XportError::new(ErrorKind::Filesystem, "write failed")
        .with_cause(io_err)
        .with_retry_after(Duration::from_secs(5));
    assert_eq!(err.kind(), ErrorKind::Filesystem);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    assert!(err.source().is_some());
}

use std::error::Error;
