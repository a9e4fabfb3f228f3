//! Mackerel REST client.
//!
//! [`MackerelClient`] is the capability the [`crate::api::Api`] facade
//! delegates to. [`HttpMackerelClient`] talks to the real API through a
//! shared [`Transport`]; tests can substitute [`mock::MockMackerelClient`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::Serialize;
use urlencoding::encode;

use super::error::ApiError;
use super::transport::Transport;
use super::types::{
    CreateHostParam, FindHostsParam, GraphDefsParam, Host, HostIdResponse, HostMetricValue,
    HostResponse, HostStatus, HostsResponse, UpdateHostParam,
};

/// Typed Mackerel API operations. Each method is a single HTTP round trip.
#[async_trait]
pub trait MackerelClient: Send + Sync {
    /// Fetch a host by ID.
    async fn find_host(&self, id: &str) -> Result<Host, ApiError>;

    /// List hosts matching `param`.
    async fn find_hosts(&self, param: &FindHostsParam) -> Result<Vec<Host>, ApiError>;

    /// Register a host and return its new ID.
    async fn create_host(&self, param: &CreateHostParam) -> Result<String, ApiError>;

    /// Replace the information of an existing host. Returns the host ID.
    async fn update_host(&self, id: &str, param: &UpdateHostParam) -> Result<String, ApiError>;

    /// Change the status of a host.
    async fn update_host_status(&self, id: &str, status: HostStatus) -> Result<(), ApiError>;

    /// Post metric values for one or more hosts.
    async fn post_host_metric_values(&self, values: &[HostMetricValue]) -> Result<(), ApiError>;

    /// Register graph definitions for custom metrics.
    async fn create_graph_defs(&self, defs: &[GraphDefsParam]) -> Result<(), ApiError>;

    /// Retire a host.
    async fn retire_host(&self, id: &str) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct StatusBody {
    status: HostStatus,
}

#[derive(Serialize)]
struct RetireBody {}

/// HTTP-based implementation of [`MackerelClient`].
#[derive(Debug, Clone)]
pub struct HttpMackerelClient {
    transport: Arc<Transport>,
}

impl HttpMackerelClient {
    #[must_use]
    pub const fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    fn host_path(id: &str, suffix: &str) -> String {
        format!("/api/v0/hosts/{}{suffix}", encode(id))
    }
}

#[async_trait]
impl MackerelClient for HttpMackerelClient {
    async fn find_host(&self, id: &str) -> Result<Host, ApiError> {
        let url = self.transport.url_for(&Self::host_path(id, ""), None);
        let response: HostResponse = self
            .transport
            .call(self.transport.request(Method::GET, url))
            .await?;
        Ok(response.host)
    }

    async fn find_hosts(&self, param: &FindHostsParam) -> Result<Vec<Host>, ApiError> {
        let url = self.transport.url_for("/api/v0/hosts", None);
        let request = self
            .transport
            .request(Method::GET, url)
            .query(&param.query_pairs());
        let response: HostsResponse = self.transport.call(request).await?;
        Ok(response.hosts)
    }

    async fn create_host(&self, param: &CreateHostParam) -> Result<String, ApiError> {
        let response: HostIdResponse = self
            .transport
            .send_json(Method::POST, "/api/v0/hosts", param)
            .await?;
        Ok(response.id)
    }

    async fn update_host(&self, id: &str, param: &UpdateHostParam) -> Result<String, ApiError> {
        let response: HostIdResponse = self
            .transport
            .send_json(Method::PUT, &Self::host_path(id, ""), param)
            .await?;
        Ok(response.id)
    }

    async fn update_host_status(&self, id: &str, status: HostStatus) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .transport
            .send_json(
                Method::POST,
                &Self::host_path(id, "/status"),
                &StatusBody { status },
            )
            .await?;
        Ok(())
    }

    async fn post_host_metric_values(&self, values: &[HostMetricValue]) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .transport
            .send_json(Method::POST, "/api/v0/tsdb", values)
            .await?;
        Ok(())
    }

    async fn create_graph_defs(&self, defs: &[GraphDefsParam]) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .transport
            .send_json(Method::POST, "/api/v0/graph-defs/create", defs)
            .await?;
        Ok(())
    }

    async fn retire_host(&self, id: &str) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .transport
            .send_json(Method::POST, &Self::host_path(id, "/retire"), &RetireBody {})
            .await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::missing_const_for_fn,
    clippy::must_use_candidate
)]
pub mod mock {
    //! Mock implementation for unit testing.

    use super::{
        ApiError, CreateHostParam, FindHostsParam, GraphDefsParam, Host, HostMetricValue,
        HostStatus, MackerelClient, UpdateHostParam,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// A call received by [`MockMackerelClient`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        FindHost(String),
        FindHosts(FindHostsParam),
        CreateHost(CreateHostParam),
        UpdateHost(String, UpdateHostParam),
        UpdateHostStatus(String, HostStatus),
        PostHostMetricValues(Vec<HostMetricValue>),
        CreateGraphDefs(Vec<GraphDefsParam>),
        RetireHost(String),
    }

    /// Mock implementation of [`MackerelClient`] for unit tests.
    ///
    /// Configure responses with the `set_*_result` methods and inspect
    /// received calls with [`MockMackerelClient::calls`]. Unconfigured
    /// lookups return HTTP 404; unconfigured writes succeed.
    #[derive(Default)]
    pub struct MockMackerelClient {
        find_host_result: Mutex<Option<Result<Host, ApiError>>>,
        find_hosts_result: Mutex<Option<Result<Vec<Host>, ApiError>>>,
        create_host_result: Mutex<Option<Result<String, ApiError>>>,
        write_result: Mutex<Option<Result<(), ApiError>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockMackerelClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Set the result for the next `find_host` call.
        pub fn set_find_host_result(&self, result: Result<Host, ApiError>) {
            *self.find_host_result.lock().unwrap() = Some(result);
        }

        /// Set the result for the next `find_hosts` call.
        pub fn set_find_hosts_result(&self, result: Result<Vec<Host>, ApiError>) {
            *self.find_hosts_result.lock().unwrap() = Some(result);
        }

        /// Set the result for the next `create_host` call.
        pub fn set_create_host_result(&self, result: Result<String, ApiError>) {
            *self.create_host_result.lock().unwrap() = Some(result);
        }

        /// Set the result for the next call that returns no value.
        pub fn set_write_result(&self, result: Result<(), ApiError>) {
            *self.write_result.lock().unwrap() = Some(result);
        }

        /// All calls received so far, in order.
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn write(&self) -> Result<(), ApiError> {
            self.write_result.lock().unwrap().take().unwrap_or(Ok(()))
        }

        fn not_found() -> ApiError {
            ApiError::Http {
                status: 404,
                message: "Host Not Found.".into(),
            }
        }
    }

    #[async_trait]
    impl MackerelClient for MockMackerelClient {
        async fn find_host(&self, id: &str) -> Result<Host, ApiError> {
            self.record(Call::FindHost(id.to_string()));
            self.find_host_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Self::not_found()))
        }

        async fn find_hosts(&self, param: &FindHostsParam) -> Result<Vec<Host>, ApiError> {
            self.record(Call::FindHosts(param.clone()));
            self.find_hosts_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn create_host(&self, param: &CreateHostParam) -> Result<String, ApiError> {
            self.record(Call::CreateHost(param.clone()));
            self.create_host_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok("MOCKHOST".to_string()))
        }

        async fn update_host(
            &self,
            id: &str,
            param: &UpdateHostParam,
        ) -> Result<String, ApiError> {
            self.record(Call::UpdateHost(id.to_string(), param.clone()));
            self.write().map(|()| id.to_string())
        }

        async fn update_host_status(&self, id: &str, status: HostStatus) -> Result<(), ApiError> {
            self.record(Call::UpdateHostStatus(id.to_string(), status));
            self.write()
        }

        async fn post_host_metric_values(
            &self,
            values: &[HostMetricValue],
        ) -> Result<(), ApiError> {
            self.record(Call::PostHostMetricValues(values.to_vec()));
            self.write()
        }

        async fn create_graph_defs(&self, defs: &[GraphDefsParam]) -> Result<(), ApiError> {
            self.record(Call::CreateGraphDefs(defs.to_vec()));
            self.write()
        }

        async fn retire_host(&self, id: &str) -> Result<(), ApiError> {
            self.record(Call::RetireHost(id.to_string()));
            self.write()
        }
    }
}
