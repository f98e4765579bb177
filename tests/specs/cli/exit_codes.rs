//! Exit code specs (spec.md §6): 0 success, 1 configuration error, 2
//! runtime error, 130 interrupted.

use crate::prelude::*;

#[test]
fn run_once_with_default_config_succeeds() {
    let sandbox = Sandbox::new();
    sandbox.xport(["--run"]).assert_code(EXIT_SUCCESS);
}

#[test]
fn run_once_against_an_explicit_minimal_config_succeeds() {
    let sandbox = Sandbox::new();
    let config = sandbox.minimal_config();
    sandbox.xport(["--run", "--config", config.to_str().expect("utf8 path")]).assert_code(EXIT_SUCCESS);
}

#[test]
fn run_once_accepts_every_named_export_scope() {
    for scope in ["watched", "collection", "ratings", "watchlist", "all"] {
        let sandbox = Sandbox::new();
        sandbox.xport(["--run", "--export", scope]).assert_code(EXIT_SUCCESS);
    }
}

#[test]
fn run_once_accepts_both_export_modes() {
    for mode in ["normal", "complete"] {
        let sandbox = Sandbox::new();
        sandbox.xport(["--run", "--mode", mode]).assert_code(EXIT_SUCCESS);
    }
}

#[test]
fn missing_config_file_is_a_configuration_error() {
    let sandbox = Sandbox::new();
    let missing = sandbox.path().join("does-not-exist.toml");
    sandbox
        .xport(["--run", "--config", missing.to_str().expect("utf8 path")])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("xport:");
}
