// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn progress_is_zero_with_no_submissions() {
    let report = ExportReport::new("op-1", ExportScope::Watched, 0);
    assert_eq!(report.progress(), 0.0);
    assert!(!report.is_complete());
}

#[test]
fn progress_clamps_to_one() {
    let mut report = ExportReport::new("op-1", ExportScope::All, 0);
    report.submitted = 10;
    report.processed = 12; // defensive: should never exceed submitted, but clamp anyway
    assert_eq!(report.progress(), 1.0);
}

#[test]
fn completes_when_processed_plus_failed_reach_submitted() {
    let mut report = ExportReport::new("op-1", ExportScope::Ratings, 0);
    report.submitted = 3;
    report.processed = 2;
    report.failed = 1;
    assert!(report.is_complete());
    assert_eq!(report.progress(), 1.0);
}
