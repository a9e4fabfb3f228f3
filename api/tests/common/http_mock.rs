//! HTTP mock server helpers for testing outbound HTTP calls.
//!
//! This module provides a thin wrapper around `wiremock` for declarative
//! HTTP stubbing of the Mackerel API.
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::common::http_mock::MockHttpServer;
//!
//! #[tokio::test]
//! async fn test_retire() {
//!     let server = MockHttpServer::start().await;
//!
//!     server
//!         .expect_post("/api/v0/hosts/ABCD123/retire")
//!         .respond_with_json(json!({"success": true}))
//!         .expect_times(1)
//!         .mount()
//!         .await;
//!
//!     let api = Api::new(&server.url(), "dummy-key", false).unwrap();
//!     api.retire_host("ABCD123").await.unwrap();
//!     server.verify().await;
//! }
//! ```
//!
//! # Patterns
//!
//! - **Success response**: `.respond_with_json(value)`
//! - **Error response**: `.respond_with_status(500)` plus optional `.with_json_response(value)`
//! - **Timeout simulation**: `.respond_with_delay(Duration::from_secs(30))`
//! - **Request verification**: `.expect_times(1)` and `received_requests()`

#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
pub use wiremock::matchers::{body_json, header, method, path, query_param};
pub use wiremock::MockServer as WiremockServer;
pub use wiremock::{Mock, ResponseTemplate};

/// A running stub server.
pub struct MockHttpServer {
    server: WiremockServer,
}

impl MockHttpServer {
    pub async fn start() -> Self {
        Self {
            server: WiremockServer::start().await,
        }
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:53211`.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// The underlying wiremock server, for matchers not wrapped here.
    pub fn inner(&self) -> &WiremockServer {
        &self.server
    }

    pub fn expect_get(&self, path: &str) -> StubBuilder<'_> {
        StubBuilder::new(self, "GET", path)
    }

    pub fn expect_post(&self, path: &str) -> StubBuilder<'_> {
        StubBuilder::new(self, "POST", path)
    }

    pub fn expect_put(&self, path: &str) -> StubBuilder<'_> {
        StubBuilder::new(self, "PUT", path)
    }

    /// Panics if any `expect_times` expectation was not met.
    pub async fn verify(&self) {
        self.server.verify().await;
    }

    /// Every request received so far.
    #[allow(clippy::expect_used)]
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .expect("request recording is enabled")
    }

    /// Decoded JSON body of the only request received.
    #[allow(clippy::expect_used)]
    pub async fn single_json_body(&self) -> Value {
        let requests = self.received_requests().await;
        assert_eq!(requests.len(), 1, "expected exactly one request");
        serde_json::from_slice(&requests[0].body).expect("request body should be JSON")
    }
}

/// Declarative stub under construction.
pub struct StubBuilder<'a> {
    server: &'a MockHttpServer,
    method: &'static str,
    path: String,
    headers: Vec<(String, String)>,
    status: u16,
    body: Option<Value>,
    delay: Option<Duration>,
    times: Option<u64>,
}

impl<'a> StubBuilder<'a> {
    fn new(server: &'a MockHttpServer, method: &'static str, path: &str) -> Self {
        Self {
            server,
            method,
            path: path.to_string(),
            headers: Vec::new(),
            status: 200,
            body: None,
            delay: None,
            times: None,
        }
    }

    /// Only match requests carrying this header value.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Respond 200 with a JSON body.
    pub fn respond_with_json(mut self, body: Value) -> Self {
        self.status = 200;
        self.body = Some(body);
        self
    }

    /// Respond with `status` and no body.
    pub fn respond_with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Attach a JSON body while keeping the configured status.
    pub fn with_json_response(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn respond_with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Assert the stub is hit exactly `times` times on `verify`.
    pub fn expect_times(mut self, times: u64) -> Self {
        self.times = Some(times);
        self
    }

    pub async fn mount(self) {
        let mut mock = Mock::given(method(self.method)).and(path(self.path));
        for (name, value) in &self.headers {
            mock = mock.and(header(name.as_str(), value.as_str()));
        }

        let mut response = ResponseTemplate::new(self.status);
        if let Some(body) = self.body {
            response = response.set_body_json(body);
        }
        if let Some(delay) = self.delay {
            response = response.set_delay(delay);
        }

        let mut mock = mock.respond_with(response);
        if let Some(times) = self.times {
            mock = mock.expect(times);
        }
        mock.mount(&self.server.server).await;
    }
}
