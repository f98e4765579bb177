// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expression validation (spec §4.1, §6): the standard five-field
//! format (minute hour day-of-month month day-of-week). The `cron` crate
//! wants a leading seconds field and an optional trailing year; we pin
//! both so the public surface only ever sees five fields.

use chrono::{DateTime, Utc};

use xport_core::{ErrorKind, XportError};

/// Human-oriented examples attached to `ErrInvalidInput` (spec §4.1).
pub const EXAMPLES: &[&str] = &[
    "0 * * * *       (every hour, on the hour)",
    "*/15 * * * *    (every 15 minutes)",
    "0 0 * * *       (daily at midnight)",
    "0 9 * * 1-5     (weekdays at 09:00)",
];

/// Parses and validates a five-field cron expression, returning the
/// underlying schedule used to compute fire times.
pub fn validate(expr: &str) -> Result<cron::Schedule, XportError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(invalid(format!(
            "expected 5 fields (minute hour day month weekday), found {}: \"{expr}\"",
            fields.len()
        )));
    }

    let extended = format!("0 {expr} *");
    extended
        .parse::<cron::Schedule>()
        .map_err(|e| invalid(format!("\"{expr}\" does not parse: {e}")))
}

fn invalid(detail: String) -> XportError {
    XportError::new(
        ErrorKind::InvalidInput,
        format!("invalid cron expression: {detail} — examples:\n{}", EXAMPLES.join("\n")),
    )
}

/// Next fire time strictly after `after`, per the schedule.
pub fn next_run_after(schedule: &cron::Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
