//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stream a response body to the end
async fn read_body(client: &HttpClient, path: &str, config: RequestConfig) -> Result<Vec<u8>> {
    let chunks: Vec<Bytes> = client.get_stream(path, config).await?.try_collect().await?;
    Ok(chunks.concat())
}

fn fast_config(base_url: &str, attempts: u32) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(base_url)
        .retries(attempts, Duration::from_millis(10))
        .no_rate_limit()
        .build()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(300));
    assert_eq!(config.max_attempts, 30);
    assert_eq!(config.retry_wait, Duration::from_secs(120));
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("tap-appmetrica/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .retries(5, Duration::from_secs(2))
        .rate_limit(RateLimiterConfig::per_second(3))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.retry_wait, Duration::from_secs(2));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::per_second(3)));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");

    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts(), 5);
    assert_eq!(policy.wait(), Duration::from_secs(2));
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("date_since", "2024-01-01 00:00:00")
        .query("limit", "10")
        .header("X-Request-Id", "abc123")
        .timeout(Duration::from_secs(10));

    assert_eq!(config.get_query("date_since"), Some("2024-01-01 00:00:00"));
    assert_eq!(config.get_query("limit"), Some("10"));
    assert_eq!(config.get_query("missing"), None);
    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
}

#[tokio::test]
async fn test_get_stream_with_auth_and_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logs/v1/export/events.csv"))
        .and(header("Authorization", "OAuth test-token"))
        .and(query_param("application_id", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        HttpClient::with_auth(fast_config(&mock_server.uri(), 3), AuthConfig::oauth("test-token"))
            .unwrap();

    let body = read_body(
        &client,
        "/logs/v1/export/events.csv",
        RequestConfig::new().query("application_id", "42"),
    )
    .await
    .unwrap();

    assert_eq!(&body[..], b"a,b\n1,2\n");
}

#[tokio::test]
async fn test_default_and_request_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .and(header("X-Default", "one"))
        .and(header("X-Request", "two"))
        .and(header("User-Agent", "custom-agent"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .header("X-Default", "one")
        .user_agent("custom-agent")
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let response = client
        .get("/api", RequestConfig::new().header("X-Request", "two"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_202_is_retried_until_ready() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(202).set_body_string("preparing"))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ready"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri(), 5)).unwrap();
    let body = read_body(&client, "/export", RequestConfig::new()).await.unwrap();

    assert_eq!(&body[..], b"ready");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_retryable_statuses_exhaust_exact_attempts() {
    for status in [202u16, 429, 500] {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(status))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = HttpClient::with_config(fast_config(&mock_server.uri(), 3)).unwrap();
        let started = Instant::now();
        let result = read_body(&client, "/flaky", RequestConfig::new()).await;

        assert!(started.elapsed() >= Duration::from_millis(20));
        match result.unwrap_err() {
            Error::MaxRetriesExceeded {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains(&status.to_string()));
            }
            other => panic!("unexpected error for {status}: {other}"),
        }
        mock_server.verify().await;
    }
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    for status in [401u16, 403] {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secure"))
            .respond_with(ResponseTemplate::new(status).set_body_string("invalid token"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::with_config(fast_config(&mock_server.uri(), 5)).unwrap();
        let err = read_body(&client, "/secure", RequestConfig::new())
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert!(err.to_string().contains("invalid token"));
        mock_server.verify().await;
    }
}

#[tokio::test]
async fn test_client_error_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad fields"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri(), 5)).unwrap();
    let err = client.get("/missing", RequestConfig::new()).await.unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad fields");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_check_once_sends_once_and_accepts_202() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri(), 5)).unwrap();
    let status = client.check_once("/export", RequestConfig::new()).await.unwrap();

    assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_check_once_reports_auth_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri(), 5)).unwrap();
    let err = client.check_once("/export", RequestConfig::new()).await.unwrap_err();

    assert!(err.is_auth());
}

#[tokio::test]
async fn test_full_url_bypasses_base() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config("https://unused.invalid", 1)).unwrap();
    let response = client
        .get(&format!("{}/direct", mock_server.uri()), RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_http_client_with_rate_limiter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .rate_limit(RateLimiterConfig::new(100, 10))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());

    for _ in 0..3 {
        client.get("/", RequestConfig::new()).await.unwrap();
    }
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::with_auth(HttpClientConfig::default(), AuthConfig::oauth("t")).unwrap();
    let debug = format!("{client:?}");
    assert!(debug.contains("HttpClient"));
    assert!(debug.contains("has_authenticator: true"));
}
