// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client discipline (spec §4.6): token injection, rate-limit wait,
//! retry/backoff, and a tracing span, applied in that order around an
//! underlying `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Method, StatusCode};
use tracing::Instrument;

use xport_core::{ErrorKind, XportError};

use crate::circuit_breaker::CircuitBreaker;
use crate::rate_limiter::RateLimiter;

const BASE_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 5;

/// Narrow seam for refreshing an OAuth access token. `xport-storage`'s
/// token manager implements this; `xport-net` depends only on the trait so
/// the two crates stay siblings rather than one owning the other (spec
/// §4.9's single-flight refresh lives on the implementor's side).
#[async_trait]
pub trait OAuthTokenSource: Send + Sync {
    /// Returns the current access token, refreshing first only if it is
    /// about to expire.
    async fn access_token(&self) -> Result<String, XportError>;

    /// Forces a refresh, e.g. after a 401. Returns the new token.
    async fn refresh(&self) -> Result<String, XportError>;
}

pub struct HttpClientConfig {
    pub failure_threshold: u32,
    pub circuit_cool_off: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self { failure_threshold: 10, circuit_cool_off: Duration::from_secs(30) }
    }
}

/// Decorates `reqwest` with token injection, rate limiting, retry/backoff,
/// circuit breaking, and tracing, in the order spec §4.6 prescribes.
pub struct DisciplinedClient {
    inner: reqwest::Client,
    rate_limiter: std::sync::Arc<RateLimiter>,
    circuit_breaker: CircuitBreaker,
    token_source: Option<std::sync::Arc<dyn OAuthTokenSource>>,
}

impl DisciplinedClient {
    pub fn new(
        inner: reqwest::Client,
        rate_limiter: std::sync::Arc<RateLimiter>,
        config: HttpClientConfig,
    ) -> Self {
        Self {
            inner,
            rate_limiter,
            circuit_breaker: CircuitBreaker::new(config.failure_threshold, config.circuit_cool_off),
            token_source: None,
        }
    }

    pub fn with_token_source(mut self, source: std::sync::Arc<dyn OAuthTokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Issue a request to `service` (the rate-limiter/circuit-breaker key)
    /// at `url`, applying the full discipline.
    pub async fn request(
        &self,
        service: &str,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, XportError> {
        let span = tracing::info_span!("http_request", service, %method, url);
        self.request_inner(service, method, url, body).instrument(span).await
    }

    async fn request_inner(
        &self,
        service: &str,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, XportError> {
        self.circuit_breaker.check(service)?;

        let idempotent = matches!(method, Method::GET | Method::HEAD);
        let mut attempt: u32 = 0;
        let mut refreshed_once = false;
        let mut wrote_bytes = false;

        loop {
            attempt += 1;

            self.rate_limiter.wait(service, std::future::pending()).await?;

            let mut builder = self.inner.request(method.clone(), url);
            if let Some(source) = &self.token_source {
                let token = source.access_token().await?;
                builder = builder.bearer_auth(token);
            }
            if let Some(bytes) = &body {
                builder = builder.body(bytes.clone());
                wrote_bytes = true;
            }

            let outcome = builder.send().await;

            match outcome {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::UNAUTHORIZED {
                        if !refreshed_once && self.token_source.is_some() {
                            refreshed_once = true;
                            if let Some(source) = &self.token_source {
                                source.refresh().await?;
                            }
                            continue;
                        }
                        self.circuit_breaker.record_failure(service);
                        return Err(XportError::new(
                            ErrorKind::ReauthRequired,
                            "authentication failed after one refresh attempt",
                        ));
                    }

                    if status.is_success() {
                        self.circuit_breaker.record_success(service);
                        return Ok(response);
                    }

                    let retryable = status.is_server_error()
                        && (idempotent || !wrote_bytes)
                        && attempt < MAX_ATTEMPTS;

                    if !retryable {
                        self.circuit_breaker.record_failure(service);
                        return Err(classify_status(status));
                    }

                    self.circuit_breaker.record_failure(service);
                    let retry_after = retry_after_from(&response);
                    self.sleep_backoff(attempt, retry_after).await;
                }
                Err(e) => {
                    self.circuit_breaker.record_failure(service);
                    let can_retry = (idempotent || !wrote_bytes) && attempt < MAX_ATTEMPTS;
                    if !can_retry {
                        return Err(XportError::new(ErrorKind::Transient, "http request failed").with_cause(e));
                    }
                    self.sleep_backoff(attempt, None).await;
                }
            }
        }
    }

    async fn sleep_backoff(&self, attempt: u32, retry_after: Option<Duration>) {
        let capped = retry_after.unwrap_or_else(|| full_jitter_backoff(attempt));
        tokio::time::sleep(capped.min(MAX_BACKOFF)).await;
    }
}

fn full_jitter_backoff(attempt: u32) -> Duration {
    let exp = BASE_BACKOFF.as_millis() as u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
    let capped = exp.min(MAX_BACKOFF.as_millis() as u64);
    let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
    Duration::from_millis(jittered)
}

fn retry_after_from(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn classify_status(status: StatusCode) -> XportError {
    if status.is_server_error() {
        XportError::new(ErrorKind::Upstream5xx, format!("upstream returned {status}"))
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        XportError::new(ErrorKind::RateLimited, "upstream rate limited the request")
    } else {
        XportError::new(ErrorKind::Upstream4xx, format!("upstream returned {status}"))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
