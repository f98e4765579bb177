// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The one-shot invocation surface (spec §6): five flags, hand-parsed.
//! A full argument-parsing framework is a named non-goal (spec.md §1);
//! this is the minimum surface the spec actually names.

use xport_core::{ErrorKind, ExportScope, XportError};
use xport_scheduler::ExportMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Run,
    Schedule,
}

#[derive(Debug, Clone)]
pub struct Args {
    pub mode: RunMode,
    pub cron: Option<String>,
    pub scope: ExportScope,
    pub export_mode: ExportMode,
    pub config_path: Option<std::path::PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            mode: RunMode::Run,
            cron: None,
            scope: ExportScope::All,
            export_mode: ExportMode::Normal,
            config_path: None,
        }
    }
}

pub fn parse<I: IntoIterator<Item = String>>(argv: I) -> Result<Args, XportError> {
    let mut args = Args::default();
    let mut saw_run = false;
    let mut saw_schedule = false;
    let mut iter = argv.into_iter().peekable();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--run" => saw_run = true,
            "--schedule" => {
                saw_schedule = true;
                args.cron = Some(require_value(&mut iter, "--schedule")?);
            }
            "--export" => {
                let value = require_value(&mut iter, "--export")?;
                args.scope = parse_scope(&value)?;
            }
            "--mode" => {
                let value = require_value(&mut iter, "--mode")?;
                args.export_mode = parse_export_mode(&value)?;
            }
            "--config" => {
                args.config_path = Some(std::path::PathBuf::from(require_value(&mut iter, "--config")?));
            }
            other => {
                return Err(XportError::new(ErrorKind::InvalidInput, format!("unrecognized flag: {other}")));
            }
        }
    }

    if saw_run && saw_schedule {
        return Err(XportError::new(ErrorKind::InvalidInput, "--run and --schedule are mutually exclusive"));
    }
    args.mode = if saw_schedule { RunMode::Schedule } else { RunMode::Run };
    Ok(args)
}

fn require_value(iter: &mut std::iter::Peekable<impl Iterator<Item = String>>, flag: &str) -> Result<String, XportError> {
    iter.next().ok_or_else(|| XportError::new(ErrorKind::InvalidInput, format!("{flag} requires a value")))
}

fn parse_scope(value: &str) -> Result<ExportScope, XportError> {
    match value {
        "watched" => Ok(ExportScope::Watched),
        "collection" => Ok(ExportScope::Collection),
        "ratings" => Ok(ExportScope::Ratings),
        "watchlist" => Ok(ExportScope::Watchlist),
        "all" => Ok(ExportScope::All),
        other => Err(XportError::new(
            ErrorKind::InvalidInput,
            format!("unknown --export scope '{other}' (expected watched|collection|ratings|watchlist|all)"),
        )),
    }
}

fn parse_export_mode(value: &str) -> Result<ExportMode, XportError> {
    match value {
        "normal" => Ok(ExportMode::Normal),
        "complete" => Ok(ExportMode::Complete),
        other => Err(XportError::new(
            ErrorKind::InvalidInput,
            format!("unknown --mode '{other}' (expected normal|complete)"),
        )),
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
