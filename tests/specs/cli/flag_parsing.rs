//! Flag-parsing specs (spec.md §6): the five-flag minimal surface, hand
//! parsed rather than framework-driven (a full flag parser is a named
//! non-goal, spec.md §1).

use crate::prelude::*;

#[test]
fn run_and_schedule_together_are_rejected_as_mutually_exclusive() {
    let sandbox = Sandbox::new();
    sandbox
        .xport(["--run", "--schedule", "0 * * * *"])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("mutually exclusive");
}

#[test]
fn unrecognized_flag_is_a_configuration_error() {
    let sandbox = Sandbox::new();
    sandbox.xport(["--bogus-flag"]).assert_code(EXIT_CONFIG_ERROR).assert_stderr_has("unrecognized flag");
}

#[test]
fn unknown_export_scope_is_a_configuration_error() {
    let sandbox = Sandbox::new();
    sandbox
        .xport(["--run", "--export", "nonsense"])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("unknown --export scope");
}

#[test]
fn unknown_mode_is_a_configuration_error() {
    let sandbox = Sandbox::new();
    sandbox.xport(["--run", "--mode", "nonsense"]).assert_code(EXIT_CONFIG_ERROR).assert_stderr_has("unknown --mode");
}

#[test]
fn schedule_without_a_value_is_a_configuration_error() {
    let sandbox = Sandbox::new();
    sandbox
        .xport(["--schedule"])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("--schedule requires a value");
}
