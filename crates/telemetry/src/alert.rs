// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert creation, rate limiting, history, and channel fan-out (spec §3,
//! §4.8).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub timestamp_ms: u64,
    pub source: String,
    pub metadata: HashMap<String, String>,
    pub resolved: bool,
    pub resolved_at_ms: Option<u64>,
}

/// Per-channel delivery outcome; a failed channel never blocks the rest
/// (spec §3).
#[derive(Debug, Clone)]
pub struct ChannelResult {
    pub channel: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, alert: &Alert) -> Result<(), String>;
}

pub struct WebhookAlertChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlertChannel {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl AlertChannel for WebhookAlertChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, alert: &Alert) -> Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(alert)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("webhook returned {}", response.status()));
        }
        Ok(())
    }
}

pub struct SlackAlertChannel {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackAlertChannel {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self { client, webhook_url: webhook_url.into() }
    }
}

#[async_trait]
impl AlertChannel for SlackAlertChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, alert: &Alert) -> Result<(), String> {
        let payload = serde_json::json!({
            "text": format!("[{:?}] {}: {}", alert.level, alert.title, alert.message),
        });
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("slack webhook returned {}", response.status()));
        }
        Ok(())
    }
}

/// Narrow seam for the mail transport; no SMTP client appears anywhere in
/// the corpus so email delivery stays behind this trait rather than
/// fabricating a dependency (see DESIGN.md).
pub trait Mailer: Send + Sync {
    fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

pub struct EmailAlertChannel {
    mailer: Box<dyn Mailer>,
    recipient: String,
}

impl EmailAlertChannel {
    pub fn new(mailer: Box<dyn Mailer>, recipient: impl Into<String>) -> Self {
        Self { mailer, recipient: recipient.into() }
    }
}

#[async_trait]
impl AlertChannel for EmailAlertChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, alert: &Alert) -> Result<(), String> {
        self.mailer.send_mail(&self.recipient, &alert.title, &alert.message)
    }
}

struct RateLimitEntry {
    last_sent_ms: u64,
}

pub struct AlertManager {
    channels: Vec<Box<dyn AlertChannel>>,
    history: Mutex<VecDeque<Alert>>,
    rate_limits: Mutex<HashMap<(String, String, String), RateLimitEntry>>,
    window: Duration,
    next_id: std::sync::atomic::AtomicU64,
}

impl AlertManager {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>, window: Duration) -> Self {
        Self {
            channels,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
            rate_limits: Mutex::new(HashMap::new()),
            window,
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn next_alert_id(&self, now_ms: u64) -> String {
        let seq = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("alert-{now_ms}-{seq}")
    }

    fn rate_limited(&self, key: &(String, String, String), now_ms: u64) -> bool {
        let mut limits = self.rate_limits.lock();
        match limits.get(key) {
            Some(entry) if now_ms.saturating_sub(entry.last_sent_ms) < self.window.as_millis() as u64 => true,
            _ => {
                limits.insert(key.clone(), RateLimitEntry { last_sent_ms: now_ms });
                false
            }
        }
    }

    fn record_history(&self, alert: Alert) {
        let mut history = self.history.lock();
        if history.len() >= HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(alert);
    }

    /// Create and fan out an alert. Returns `None` if the `(source,
    /// level, title)` tuple is currently rate-limited (spec §3); otherwise
    /// returns the per-channel delivery outcomes.
    pub async fn fire(
        &self,
        level: AlertLevel,
        title: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<String>,
        metadata: HashMap<String, String>,
        now_ms: u64,
    ) -> Option<Vec<ChannelResult>> {
        let title = title.into();
        let source = source.into();
        let level_key = format!("{level:?}");
        let key = (source.clone(), level_key, title.clone());

        if self.rate_limited(&key, now_ms) {
            return None;
        }

        let alert = Alert {
            id: self.next_alert_id(now_ms),
            level,
            title,
            message: message.into(),
            timestamp_ms: now_ms,
            source,
            metadata,
            resolved: false,
            resolved_at_ms: None,
        };

        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let outcome = channel.send(&alert).await;
            results.push(ChannelResult {
                channel: channel.name().to_string(),
                error: outcome.err(),
            });
        }

        self.record_history(alert);
        Some(results)
    }

    pub fn history(&self) -> Vec<Alert> {
        self.history.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "alert_tests.rs"]
mod tests;
