// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed input-validation rule set and log sanitization (spec §4.10).

use xport_core::{ErrorKind, XportError};

const SQL_MARKERS: &[&str] =
    &["--", ";--", "; drop", "union select", "' or '1'='1", "xp_cmdshell"];
const XSS_MARKERS: &[&str] = &["<script", "javascript:", "onerror=", "onload="];

/// Names of fields whose values are redacted by [`sanitize_for_log`] and by
/// the audit log / logger layers, unless `include_sensitive` is set.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] =
    &["password", "token", "access_token", "refresh_token", "secret", "api_key", "client_secret"];

/// Reject a string containing common SQL-injection markers.
///
/// This is a defense-in-depth input gate, not a substitute for parameterized
/// queries; the check is intentionally conservative (substring match on a
/// small marker set) per spec §4.10's "fixed rule set".
pub fn no_sql_injection(value: &str) -> Result<(), XportError> {
    let lower = value.to_ascii_lowercase();
    for marker in SQL_MARKERS {
        if lower.contains(marker) {
            return Err(XportError::new(
                ErrorKind::SecurityViolation,
                format!("value contains a SQL-injection marker: {marker:?}"),
            ));
        }
    }
    Ok(())
}

/// Reject a string containing common XSS markers.
pub fn no_xss(value: &str) -> Result<(), XportError> {
    let lower = value.to_ascii_lowercase();
    for marker in XSS_MARKERS {
        if lower.contains(marker) {
            return Err(XportError::new(
                ErrorKind::SecurityViolation,
                format!("value contains an XSS marker: {marker:?}"),
            ));
        }
    }
    Ok(())
}

/// Reject a path-like string containing `..` or a null byte.
pub fn path_rule(value: &str) -> Result<(), XportError> {
    if value.contains("..") || value.contains('\0') {
        return Err(XportError::new(
            ErrorKind::SecurityViolation,
            "path value contains a traversal or NUL byte",
        ));
    }
    Ok(())
}

/// Reject a configuration value that contains control characters (other
/// than ordinary whitespace) or exceeds a generous length cap.
pub fn config_value_rule(value: &str) -> Result<(), XportError> {
    if value.len() > 8192 {
        return Err(XportError::new(ErrorKind::InvalidInput, "config value too long"));
    }
    if value.chars().any(|c| c.is_control() && c != '\t' && c != '\n') {
        return Err(XportError::new(
            ErrorKind::InvalidInput,
            "config value contains control characters",
        ));
    }
    Ok(())
}

/// Quote control characters and mask substrings that look like secrets
/// before a value is written to a log line. Matches on
/// [`DEFAULT_SENSITIVE_FIELDS`]-shaped `key=value` and `"key": "value"`
/// pairs; unconditionally escapes control characters otherwise.
pub fn sanitize_for_log(value: &str) -> String {
    let mut masked = value.to_string();
    for field in DEFAULT_SENSITIVE_FIELDS {
        masked = mask_field(&masked, field);
    }
    escape_control_chars(&masked)
}

fn mask_field(haystack: &str, field: &str) -> String {
    // Matches `field=...` up to the next whitespace/comma/quote, and
    // `"field": "..."` up to the closing quote. Good enough for structured
    // log lines; not a general JSON/URL parser.
    let mut out = String::with_capacity(haystack.len());
    let lower = haystack.to_ascii_lowercase();
    let mut idx = 0;
    while let Some(found) = lower[idx..].find(field) {
        let start = idx + found;
        out.push_str(&haystack[idx..start]);
        out.push_str(field);
        let mut cursor = start + field.len();
        let rest = &haystack[cursor..];
        let sep_len = rest.chars().take_while(|c| *c == '=' || *c == ':' || c.is_whitespace() || *c == '"').count();
        out.push_str(&haystack[cursor..cursor + sep_len]);
        cursor += sep_len;
        let value_end = haystack[cursor..]
            .find(|c: char| c == ',' || c == '"' || c.is_whitespace() || c == '}')
            .map(|o| cursor + o)
            .unwrap_or(haystack.len());
        if value_end > cursor {
            out.push_str("***REDACTED***");
        }
        idx = value_end;
    }
    out.push_str(&haystack[idx..]);
    out
}

fn escape_control_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_control() && c != '\n' && c != '\t' {
            out.push_str(&format!("\\x{:02x}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
