//! Cron validation specs (spec.md §4.1, §6): five-field standard
//! expressions only; invalid input fails with a human-oriented example
//! list rather than a bare parser error.

use crate::prelude::*;

#[test]
fn a_malformed_cron_expression_fails_with_examples() {
    let sandbox = Sandbox::new();
    sandbox
        .xport(["--schedule", "not a cron expression"])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("invalid cron expression")
        .assert_stderr_has("every hour");
}

#[test]
fn a_cron_expression_with_too_few_fields_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .xport(["--schedule", "* * *"])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("expected 5 fields");
}

#[test]
fn scheduling_without_a_cron_expression_is_a_configuration_error() {
    // --schedule with no value at all is caught by flag parsing (tested
    // separately); this covers the orchestrator-level guard for callers
    // that somehow reach `run_scheduled` with an empty expression.
    let sandbox = Sandbox::new();
    sandbox
        .xport(["--schedule", ""])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("invalid cron expression");
}
