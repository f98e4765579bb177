//! Security perimeter specs reachable from the process boundary
//! (spec.md §4.10, §6): a malformed `ENCRYPTION_KEY` must fail the whole
//! run with a configuration error rather than silently falling back to a
//! generated key.

use crate::prelude::*;

fn encrypted_file_config(sandbox: &Sandbox) -> std::path::PathBuf {
    sandbox.file(
        "xport.toml",
        r#"
[security]
keyring_backend = "encrypted_file"

[monitoring]
enabled = false
"#,
    )
}

#[test]
fn a_non_hex_encryption_key_is_a_configuration_error() {
    let sandbox = Sandbox::new();
    let config = encrypted_file_config(&sandbox);
    sandbox
        .xport_with_env(
            ["--run", "--config", config.to_str().expect("utf8 path")],
            &[("ENCRYPTION_KEY", "not-hex-at-all")],
        )
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("ENCRYPTION_KEY");
}

#[test]
fn a_wrong_length_encryption_key_is_a_configuration_error() {
    let sandbox = Sandbox::new();
    let config = encrypted_file_config(&sandbox);
    let too_short = "ab".repeat(10);
    sandbox
        .xport_with_env(["--run", "--config", config.to_str().expect("utf8 path")], &[("ENCRYPTION_KEY", &too_short)])
        .assert_code(EXIT_CONFIG_ERROR)
        .assert_stderr_has("64 hex chars");
}

#[test]
fn a_valid_encryption_key_lets_the_run_succeed() {
    let sandbox = Sandbox::new();
    let config = encrypted_file_config(&sandbox);
    // 64 hex chars == 32 bytes, the AES-256-GCM key length the encrypted
    // file backend expects.
    let key = "a".repeat(64);
    sandbox
        .xport_with_env(["--run", "--config", config.to_str().expect("utf8 path")], &[("ENCRYPTION_KEY", &key)])
        .assert_code(EXIT_SUCCESS);
}
