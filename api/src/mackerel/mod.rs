//! Mackerel REST client module.
//!
//! # Architecture
//!
//! - [`Transport`] - Request dispatch: API key and user agent headers,
//!   default headers, timeout, verbose traffic dumps
//! - [`MackerelClient`] - Trait defining the typed API operations
//! - [`HttpMackerelClient`] - Real HTTP implementation over a [`Transport`]
//! - [`mock::MockMackerelClient`] - Recording mock (behind `test-utils` feature)
//! - [`ApiError`] - Tagged error with client/server classification
//!
//! # Testing Patterns
//!
//! ## Unit Tests (Mock Implementation)
//!
//! ```ignore
//! use std::sync::Arc;
//! use mackerel_agent_api::{api::Api, config::ApiConfig};
//! use mackerel_agent_api::mackerel::mock::MockMackerelClient;
//!
//! let mock = Arc::new(MockMackerelClient::new());
//! mock.set_find_hosts_result(Ok(vec![]));
//! let api = Api::with_client(&ApiConfig::new("http://example.com", "key", false), mock.clone())?;
//! assert!(api.find_host_by_custom_identifier("foo").await.unwrap_err().is_info());
//! ```
//!
//! ## Integration Tests (HTTP Stubbing)
//!
//! ```ignore
//! let server = MockHttpServer::start().await;
//! server
//!     .expect_post("/api/v0/hosts/9rxGOHfVF8F/retire")
//!     .with_header("X-Api-Key", "dummy-key")
//!     .respond_with_json(json!({"success": true}))
//!     .expect_times(1)
//!     .mount()
//!     .await;
//!
//! let api = Api::new(&server.url(), "dummy-key", false)?;
//! api.retire_host("9rxGOHfVF8F").await?;
//! server.verify().await;
//! ```

mod client;
mod error;
mod transport;
mod types;

pub use client::{HttpMackerelClient, MackerelClient};
pub use error::ApiError;
pub use transport::{
    ApiResponse, Transport, DEFAULT_TIMEOUT, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT, DUMP_TARGET,
    X_API_KEY,
};
pub use types::{
    CheckConfig, Cloud, CreateHostParam, FindHostsParam, GraphDefsMetric, GraphDefsParam, Host,
    HostIdResponse, HostMeta, HostMetricValue, HostResponse, HostStatus, HostsResponse, Interface,
    MetricValue, ParseHostStatusError, Roles, UpdateHostParam,
};

#[cfg(any(test, feature = "test-utils"))]
pub use client::mock;
