// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::rate_limiter::BucketConfig;

fn unlimited_rate_limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(true, BucketConfig { capacity: 1000.0, refill_rate: 1000.0 }))
}

struct FixedTokenSource {
    token: String,
    refresh_calls: AtomicU32,
}

#[async_trait]
impl OAuthTokenSource for FixedTokenSource {
    async fn access_token(&self) -> Result<String, XportError> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<String, XportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone())
    }
}

#[tokio::test]
async fn successful_get_returns_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = DisciplinedClient::new(
        reqwest::Client::new(),
        unlimited_rate_limiter(),
        HttpClientConfig::default(),
    );
    let response = client
        .request("test", Method::GET, &format!("{}/ok", server.uri()), None)
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn retries_idempotent_request_on_5xx_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = DisciplinedClient::new(
        reqwest::Client::new(),
        unlimited_rate_limiter(),
        HttpClientConfig::default(),
    );
    let response = client
        .request("test", Method::GET, &format!("{}/flaky", server.uri()), None)
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn persistent_5xx_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = DisciplinedClient::new(
        reqwest::Client::new(),
        unlimited_rate_limiter(),
        HttpClientConfig { failure_threshold: 100, circuit_cool_off: Duration::from_secs(30) },
    );
    let err = client
        .request("test", Method::GET, &format!("{}/down", server.uri()), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream5xx);
}

#[tokio::test]
async fn single_401_triggers_one_refresh_then_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let source = Arc::new(FixedTokenSource { token: "tok".to_string(), refresh_calls: AtomicU32::new(0) });
    let client = DisciplinedClient::new(
        reqwest::Client::new(),
        unlimited_rate_limiter(),
        HttpClientConfig::default(),
    )
    .with_token_source(source.clone());

    let response = client
        .request("test", Method::GET, &format!("{}/secure", server.uri()), None)
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(source.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_401_promotes_to_reauth_required() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let source = Arc::new(FixedTokenSource { token: "tok".to_string(), refresh_calls: AtomicU32::new(0) });
    let client = DisciplinedClient::new(
        reqwest::Client::new(),
        unlimited_rate_limiter(),
        HttpClientConfig::default(),
    )
    .with_token_source(source);

    let err = client
        .request("test", Method::GET, &format!("{}/secure", server.uri()), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReauthRequired);
}

#[tokio::test]
async fn circuit_opens_after_threshold_and_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/always-down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = DisciplinedClient::new(
        reqwest::Client::new(),
        unlimited_rate_limiter(),
        HttpClientConfig { failure_threshold: 1, circuit_cool_off: Duration::from_secs(30) },
    );
    let _ = client
        .request("host-a", Method::GET, &format!("{}/always-down", server.uri()), None)
        .await;
    let err = client
        .request("host-a", Method::GET, &format!("{}/always-down", server.uri()), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitOpen);
}
