//! Integration tests for request dispatch: authentication and user agent
//! headers, default headers, verbose mode and timeouts.

mod common;

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::http_mock::MockHttpServer;
use common::{api_for, API_KEY};
use mackerel_agent_api::api::Api;
use mackerel_agent_api::config::ApiConfig;
use mackerel_agent_api::mackerel::{ApiError, DUMP_TARGET};
use reqwest::StatusCode;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn header_values(request: &wiremock::Request, name: &str) -> Vec<String> {
    request
        .headers
        .get_all(name)
        .iter()
        .map(|v| v.to_str().expect("ascii header").to_string())
        .collect()
}

/// Every request carries the configured API key, verbose or not.
#[tokio::test]
async fn test_api_key_sent_regardless_of_verbose() {
    for verbose in [false, true] {
        let server = MockHttpServer::start().await;
        server
            .expect_get("/")
            .with_header("X-Api-Key", API_KEY)
            .respond_with_status(200)
            .expect_times(1)
            .mount()
            .await;

        let api = Api::new(&server.url(), API_KEY, verbose).expect("valid url");
        let response = api.get("/", None).await.expect("request sent");

        assert_eq!(response.status, StatusCode::OK, "verbose = {verbose}");
        server.verify().await;
    }
}

/// In-memory log sink for a capturing subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log lock")).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Retire a host against a stub server while capturing the dump target.
async fn retire_with_captured_dumps(verbose: bool) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("{DUMP_TARGET}=trace")))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockHttpServer::start().await;
    server
        .expect_post("/api/v0/hosts/ABCD123/retire")
        .with_header("X-Api-Key", API_KEY)
        .respond_with_json(json!({"success": true}))
        .expect_times(1)
        .mount()
        .await;

    let api = Api::new(&server.url(), API_KEY, verbose).expect("valid url");
    api.retire_host("ABCD123").await.expect("should succeed");
    server.verify().await;

    logs.contents()
}

/// Verbose mode dumps both sides of the exchange under the dump target,
/// with the API key redacted.
#[tokio::test]
async fn test_verbose_mode_dumps_traffic() {
    let output = retire_with_captured_dumps(true).await;

    assert!(output.contains(DUMP_TARGET), "{output}");
    assert!(
        output.contains("POST /api/v0/hosts/ABCD123/retire HTTP/1.1"),
        "{output}"
    );
    assert!(output.contains("x-api-key: [redacted]"), "{output}");
    assert!(output.contains("{}"), "{output}");
    assert!(output.contains("HTTP/1.1 200 OK"), "{output}");
    assert!(output.contains(r#"{"success":true}"#), "{output}");
    assert!(!output.contains(API_KEY), "{output}");
}

/// Nothing is dumped when verbose mode is off.
#[tokio::test]
async fn test_quiet_mode_dumps_nothing() {
    let output = retire_with_captured_dumps(false).await;
    assert!(output.is_empty(), "{output}");
}

/// Fallback user agent is sent when none is configured.
#[tokio::test]
async fn test_default_user_agent() {
    let server = MockHttpServer::start().await;
    server
        .expect_get("/api/v0/hosts/ABCD123")
        .with_header("User-Agent", "mackerel-agent/0.0.0")
        .respond_with_json(json!({"host": {"id": "ABCD123"}}))
        .mount()
        .await;

    let api = api_for(&server.url());
    let host = api.find_host("ABCD123").await.expect("should succeed");
    assert_eq!(host.id, "ABCD123");
}

/// Default headers are appended with every value; API key and user agent
/// replace anything the defaults set.
#[tokio::test]
async fn test_default_headers_appended_and_overridden() {
    let server = MockHttpServer::start().await;
    server
        .expect_get("/")
        .respond_with_status(204)
        .mount()
        .await;

    let mut config = ApiConfig::new(server.url(), API_KEY, false);
    config.user_agent = Some("mackerel-agent/0.84.0".into());
    config
        .default_headers
        .insert("X-Team".into(), vec!["ops".into(), "sre".into()]);
    config
        .default_headers
        .insert("User-Agent".into(), vec!["curl/8.0".into()]);
    config
        .default_headers
        .insert("X-Api-Key".into(), vec!["other-key".into()]);

    let api = Api::from_config(&config).expect("valid config");
    let response = api.get("/", None).await.expect("request sent");
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let requests = server.received_requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(header_values(request, "x-team"), ["ops", "sre"]);
    assert_eq!(header_values(request, "user-agent"), ["mackerel-agent/0.84.0"]);
    assert_eq!(header_values(request, "x-api-key"), [API_KEY]);
}

/// `get` passes the raw query through and does not classify statuses.
#[tokio::test]
async fn test_raw_get_returns_error_statuses() {
    let server = MockHttpServer::start().await;
    server
        .expect_get("/api/v0/org")
        .respond_with_status(403)
        .with_json_response(json!({"error": {"message": "forbidden"}}))
        .mount()
        .await;

    let api = api_for(&server.url());
    let response = api
        .get("/api/v0/org", Some("lang=en"))
        .await
        .expect("request sent");

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&response.body).expect("json body"),
        json!({"error": {"message": "forbidden"}})
    );
    let requests = server.received_requests().await;
    assert_eq!(requests[0].url.query(), Some("lang=en"));
}

/// A slow server surfaces as a request error with no severity.
#[tokio::test]
async fn test_request_timeout() {
    let server = MockHttpServer::start().await;
    server
        .expect_get("/api/v0/hosts/ABCD123")
        .respond_with_json(json!({"host": {"id": "ABCD123"}}))
        .respond_with_delay(Duration::from_secs(5))
        .mount()
        .await;

    let mut config = ApiConfig::new(server.url(), API_KEY, false);
    config.timeout_ms = 100;
    let api = Api::from_config(&config).expect("valid config");

    let result = api.find_host("ABCD123").await;

    match result {
        Err(err @ ApiError::Request(_)) => {
            assert!(!err.is_client_error());
            assert!(!err.is_server_error());
            assert_eq!(err.status(), None);
        }
        other => panic!("expected request error, got {other:?}"),
    }
}

/// Connection failures are request errors, not HTTP errors.
#[tokio::test]
async fn test_connection_refused() {
    let api = api_for("http://127.0.0.1:1");

    let err = api.retire_host("ABCD123").await.expect_err("nothing listens");

    assert!(matches!(err, ApiError::Request(_)));
    assert!(!err.is_client_error());
    assert!(!err.is_server_error());
}
