//! Common test utilities for integration tests.
//!
//! - [`http_mock::MockHttpServer`] - wiremock-backed stub of the Mackerel API
//! - [`api_for`] - an [`Api`] pointed at a stub server with the test key

#![allow(dead_code)]

pub mod http_mock;

use mackerel_agent_api::api::Api;

/// API key every integration test sends.
pub const API_KEY: &str = "dummy-key";

/// Build a non-verbose client for `base_url` using [`API_KEY`].
#[allow(clippy::expect_used)]
pub fn api_for(base_url: &str) -> Api {
    Api::new(base_url, API_KEY, false).expect("stub server URL should parse")
}
