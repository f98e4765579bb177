// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Span-based tracing (spec §4.8): `start_span` returns a handle whose
//! drop (or explicit `end()`) closes the span; attributes are settable
//! mid-flight and an error recorded on a span flips its status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error,
}

struct SpanState {
    name: String,
    trace_id: String,
    span_id: String,
    parent_span_id: Option<String>,
    started_at: Instant,
    status: SpanStatus,
    attributes: Vec<(String, String)>,
}

/// A live span. Ending is idempotent: dropping an unfinished handle ends
/// it implicitly so a panicking caller never leaves a dangling span.
pub struct SpanHandle {
    state: Mutex<Option<SpanState>>,
    on_end: Box<dyn Fn(FinishedSpan) + Send + Sync>,
}

#[derive(Debug, Clone)]
pub struct FinishedSpan {
    pub name: String,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub duration: std::time::Duration,
    pub status: SpanStatus,
    pub attributes: Vec<(String, String)>,
}

impl SpanHandle {
    pub fn trace_id(&self) -> String {
        self.state.lock().as_ref().map(|s| s.trace_id.clone()).unwrap_or_default()
    }

    pub fn span_id(&self) -> String {
        self.state.lock().as_ref().map(|s| s.span_id.clone()).unwrap_or_default()
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(state) = self.state.lock().as_mut() {
            state.attributes.push((key.into(), value.into()));
        }
    }

    /// Recording an error flips the span's status; it does not end the span.
    pub fn record_error(&self, message: &str) {
        if let Some(state) = self.state.lock().as_mut() {
            state.status = SpanStatus::Error;
            state.attributes.push(("error.message".to_string(), message.to_string()));
        }
    }

    pub fn end(&self) {
        let finished = self.state.lock().take().map(|state| FinishedSpan {
            name: state.name,
            trace_id: state.trace_id,
            span_id: state.span_id,
            parent_span_id: state.parent_span_id,
            duration: state.started_at.elapsed(),
            status: state.status,
            attributes: state.attributes,
        });
        if let Some(finished) = finished {
            (self.on_end)(finished);
        }
    }
}

impl Drop for SpanHandle {
    fn drop(&mut self) {
        self.end();
    }
}

/// Carries trace context across a call chain; cloned into child spans.
#[derive(Debug, Clone, Default)]
pub struct TraceContext {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

/// Ratio-based sampling tracer. `sample_ratio` of 1.0 traces everything;
/// 0.0 traces nothing; spans are always created (so callers can always
/// set attributes and read ids) but a span that loses the sampling coin
/// flip is dropped silently on end instead of exported.
pub struct Tracer {
    sample_ratio: f64,
    counter: AtomicU64,
    on_finish: std::sync::Arc<dyn Fn(FinishedSpan) + Send + Sync>,
}

impl Tracer {
    pub fn new(sample_ratio: f64, on_finish: impl Fn(FinishedSpan) + Send + Sync + 'static) -> Self {
        Self {
            sample_ratio: sample_ratio.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
            on_finish: std::sync::Arc::new(on_finish),
        }
    }

    fn should_sample(&self) -> bool {
        if self.sample_ratio >= 1.0 {
            return true;
        }
        if self.sample_ratio <= 0.0 {
            return false;
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        // Deterministic modulo sampling avoids pulling a second RNG
        // dependency into a crate that already owns one via rand.
        ((n as f64 * self.sample_ratio) as u64) != (((n + 1) as f64 * self.sample_ratio) as u64)
    }

    pub fn start_span(&self, ctx: &TraceContext, name: &str) -> (TraceContext, std::sync::Arc<SpanHandle>) {
        let trace_id = ctx.trace_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let span_id = Uuid::new_v4().to_string();
        let sampled = self.should_sample();

        let child_ctx = TraceContext { trace_id: Some(trace_id.clone()), span_id: Some(span_id.clone()) };

        let on_end: Box<dyn Fn(FinishedSpan) + Send + Sync> = if sampled {
            let cb = self.on_finish.clone();
            Box::new(move |span| cb(span))
        } else {
            Box::new(|_span| {})
        };

        let handle = SpanHandle {
            state: Mutex::new(Some(SpanState {
                name: name.to_string(),
                trace_id,
                span_id,
                parent_span_id: ctx.span_id.clone(),
                started_at: Instant::now(),
                status: SpanStatus::Ok,
                attributes: Vec::new(),
            })),
            on_end,
        };

        (child_ctx, std::sync::Arc::new(handle))
    }
}

#[cfg(test)]
#[path = "tracer_tests.rs"]
mod tests;
