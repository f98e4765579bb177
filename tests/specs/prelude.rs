//! Test harness shared by every file under `tests/specs/`.
//!
//! Mirrors the teacher's `Project`/`cli()` pattern: a sandbox directory
//! per test plus a thin wrapper around the real `xport` binary, pre-wired
//! with an isolated `HOME` (so the filesystem guard's data directory,
//! keyring-backend files and checkpoints never touch the real OS data
//! dir) and monitoring disabled by default (so parallel test runs never
//! race on the fixed metrics port).

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::CommandCargoExt;
use tempfile::TempDir;

pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Writes a minimal valid `xport.toml` pointing its export directory
    /// at the sandbox, with monitoring disabled, and returns its path for
    /// `--config`.
    pub fn minimal_config(&self) -> PathBuf {
        self.file(
            "xport.toml",
            &format!(
                r#"
[letterboxd]
export_dir = "{}"

[monitoring]
enabled = false
"#,
                self.dir.path().join("export").display()
            ),
        )
    }

    /// Runs `xport` with the given args against this sandbox: isolated
    /// `HOME`, monitoring disabled unless the args supply `--config`.
    pub fn xport<I, S>(&self, args: I) -> Run
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.xport_with_env(args, &[])
    }

    /// As [`Sandbox::xport`], with additional environment variables set
    /// (e.g. `ENCRYPTION_KEY` for the encrypted-file keyring backend).
    pub fn xport_with_env<I, S>(&self, args: I, extra_env: &[(&str, &str)]) -> Run
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = std::process::Command::cargo_bin("xport").expect("xport binary builds");
        cmd.args(args);
        cmd.env("HOME", self.dir.path());
        cmd.env("MONITORING_ENABLED", "0");
        cmd.current_dir(self.dir.path());
        for (key, value) in extra_env {
            cmd.env(key, value);
        }
        let output = cmd.output().expect("xport runs");
        Run {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A completed invocation of the binary: exit code plus captured streams.
pub struct Run {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Run {
    #[track_caller]
    pub fn assert_code(&self, expected: i32) -> &Self {
        assert_eq!(self.code, expected, "exit code mismatch\nstdout: {}\nstderr: {}", self.stdout, self.stderr);
        self
    }

    #[track_caller]
    pub fn assert_stderr_has(&self, needle: &str) -> &Self {
        assert!(self.stderr.contains(needle), "expected stderr to contain {needle:?}, got: {}", self.stderr);
        self
    }

    #[track_caller]
    pub fn assert_stdout_has(&self, needle: &str) -> &Self {
        assert!(self.stdout.contains(needle), "expected stdout to contain {needle:?}, got: {}", self.stdout);
        self
    }
}

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIG_ERROR: i32 = 1;
pub const EXIT_RUNTIME_ERROR: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;
