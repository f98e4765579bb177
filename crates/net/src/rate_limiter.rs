// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-service token-bucket rate limiting with continuous refill (spec
//! §4.4, §8 S2).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use xport_security::AuditLog;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, capacity: f64, refill_rate: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
    }
}

/// Per-service bucket configuration; `capacity` and `refill_rate` are in
/// tokens and tokens/second respectively.
#[derive(Debug, Clone, Copy)]
pub struct BucketConfig {
    pub capacity: f64,
    pub refill_rate: f64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self { capacity: 10.0, refill_rate: 1.0 }
    }
}

/// Rejects at most one audit event per `(service, minute)` (spec §4.4).
struct RefusalThrottle {
    last_audited_minute: HashMap<String, u64>,
}

pub struct RateLimiter {
    enabled: bool,
    default_config: BucketConfig,
    /// Per-service overrides (spec §3 `RateLimit`, §6 `rateLimit.limits.<service>`);
    /// fixed at construction, read-only afterwards — no lock needed.
    overrides: HashMap<String, BucketConfig>,
    buckets: Mutex<HashMap<String, Bucket>>,
    refusals: Mutex<RefusalThrottle>,
    notify: Notify,
    audit: Option<std::sync::Arc<AuditLog>>,
}

impl RateLimiter {
    pub fn new(enabled: bool, default_config: BucketConfig) -> Self {
        Self {
            enabled,
            default_config,
            overrides: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
            refusals: Mutex::new(RefusalThrottle { last_audited_minute: HashMap::new() }),
            notify: Notify::new(),
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: std::sync::Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Overrides the bucket config for specific services; any service not
    /// named here keeps using `default_config` (spec §6 `rateLimit.limits`).
    pub fn with_service_limits(mut self, limits: HashMap<String, BucketConfig>) -> Self {
        self.overrides = limits;
        self
    }

    /// Sets a single service's override, building up the map one call at a
    /// time.
    pub fn with_service_limit(mut self, service: impl Into<String>, config: BucketConfig) -> Self {
        self.overrides.insert(service.into(), config);
        self
    }

    fn config_for(&self, service: &str) -> BucketConfig {
        self.overrides.get(service).copied().unwrap_or(self.default_config)
    }

    /// `allow(service) -> bool`, consuming one token if available.
    pub fn allow(&self, service: &str) -> bool {
        self.allow_n(service, 1.0)
    }

    /// `allowN(service, n) -> bool`.
    pub fn allow_n(&self, service: &str, n: f64) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let cfg = self.config_for(service);
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(service.to_string())
            .or_insert_with(|| Bucket { tokens: cfg.capacity, last_refill: now });
        bucket.refill(now, cfg.capacity, cfg.refill_rate);

        if bucket.tokens >= n {
            bucket.tokens -= n;
            true
        } else {
            drop(buckets);
            self.record_refusal(service);
            false
        }
    }

    fn record_refusal(&self, service: &str) {
        let minute = (unix_secs() / 60) as u64;
        let mut refusals = self.refusals.lock();
        let should_audit = refusals
            .last_audited_minute
            .get(service)
            .map(|&last| last != minute)
            .unwrap_or(true);
        if should_audit {
            refusals.last_audited_minute.insert(service.to_string(), minute);
            if let Some(audit) = &self.audit {
                let _ = audit.record(xport_security::AuditEvent::new(
                    unix_secs() * 1000,
                    "rate_limit_refused",
                    xport_security::Severity::Low,
                    "rate_limiter",
                    "wait",
                    "refused",
                    format!("rate limiter refused requests for service '{service}'"),
                ));
            }
        }
    }

    /// `wait(ctx, service) -> {ok | ctxErr}`: sleeps until a token is
    /// available or `cancel` resolves.
    pub async fn wait(
        &self,
        service: &str,
        cancel: impl std::future::Future<Output = ()>,
    ) -> Result<(), xport_core::XportError> {
        if !self.enabled {
            return Ok(());
        }
        tokio::pin!(cancel);
        loop {
            if self.allow(service) {
                return Ok(());
            }
            let wait_for = self.time_until_available(service);
            tokio::select! {
                _ = tokio::time::sleep(wait_for) => continue,
                _ = &mut cancel => return Err(xport_core::XportError::cancelled()),
            }
        }
    }

    fn time_until_available(&self, service: &str) -> Duration {
        let now = Instant::now();
        let cfg = self.config_for(service);
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(service.to_string())
            .or_insert_with(|| Bucket { tokens: cfg.capacity, last_refill: now });
        bucket.refill(now, cfg.capacity, cfg.refill_rate);
        let needed = 1.0 - bucket.tokens;
        if needed <= 0.0 || cfg.refill_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(needed / cfg.refill_rate)
    }
}

fn unix_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
