//! The API client facade used by the agent.
//!
//! [`Api`] binds a parsed base URL, the API key and the request settings
//! from [`ApiConfig`] to a [`MackerelClient`], and exposes one method per
//! remote operation. Nothing is retried or cached; every method issues a
//! single request and returns either the decoded value or one [`ApiError`].

use std::sync::Arc;

use reqwest::{Method, Url};

use crate::config::ApiConfig;
use crate::mackerel::{
    ApiError, ApiResponse, CreateHostParam, FindHostsParam, GraphDefsParam, Host,
    HostMetricValue, HostStatus, HttpMackerelClient, MackerelClient, Transport, UpdateHostParam,
    DEFAULT_USER_AGENT,
};

/// Mackerel API client facade.
#[derive(Clone)]
pub struct Api {
    api_key: String,
    user_agent: String,
    transport: Arc<Transport>,
    client: Arc<dyn MackerelClient>,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("base_url", &self.base_url().as_str())
            .field("verbose", &self.verbose())
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Api {
    /// Create a client for `raw_url` with default settings otherwise.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if `raw_url` cannot be parsed.
    pub fn new(raw_url: &str, api_key: &str, verbose: bool) -> Result<Self, ApiError> {
        Self::from_config(&ApiConfig::new(raw_url, api_key, verbose))
    }

    /// Create a client talking HTTP to the configured endpoint.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the base URL, API key, user agent or a
    /// default header is invalid.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let transport = Arc::new(build_transport(config)?);
        let client = Arc::new(HttpMackerelClient::new(Arc::clone(&transport)));
        Ok(Self::assemble(config, transport, client))
    }

    /// Create a client that delegates operations to `client` instead of
    /// the HTTP implementation. [`Api::get`] still uses HTTP.
    ///
    /// # Errors
    /// Same as [`Api::from_config`].
    pub fn with_client(
        config: &ApiConfig,
        client: Arc<dyn MackerelClient>,
    ) -> Result<Self, ApiError> {
        let transport = Arc::new(build_transport(config)?);
        Ok(Self::assemble(config, transport, client))
    }

    fn assemble(
        config: &ApiConfig,
        transport: Arc<Transport>,
        client: Arc<dyn MackerelClient>,
    ) -> Self {
        Self {
            api_key: config.api_key.clone(),
            user_agent: user_agent(config).to_string(),
            transport,
            client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.transport.base_url()
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.transport.verbose()
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Base URL with `path` and raw `query` substituted.
    #[must_use]
    pub fn url_for(&self, path: &str, query: Option<&str>) -> Url {
        self.transport.url_for(path, query)
    }

    /// Issue a raw GET and return the response whatever its status.
    ///
    /// # Errors
    /// Returns [`ApiError::Request`] on transport failure.
    pub async fn get(&self, path: &str, query: Option<&str>) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(path, query);
        self.transport
            .execute(self.transport.request(Method::GET, url))
            .await
    }

    /// Find a host by ID.
    ///
    /// # Errors
    /// Returns the transport or HTTP error from the API.
    pub async fn find_host(&self, id: &str) -> Result<Host, ApiError> {
        self.client.find_host(id).await
    }

    /// Find the live host registered with `custom_identifier`.
    ///
    /// Retired hosts are never matched. When several hosts match, the
    /// first one returned by the API wins.
    ///
    /// # Errors
    /// Returns [`ApiError::Info`] when no host matches (or the identifier
    /// is empty), otherwise the transport or HTTP error from the API.
    pub async fn find_host_by_custom_identifier(
        &self,
        custom_identifier: &str,
    ) -> Result<Host, ApiError> {
        if custom_identifier.is_empty() {
            return Err(no_host_for(custom_identifier));
        }
        let param = FindHostsParam {
            custom_identifier: custom_identifier.to_string(),
            statuses: HostStatus::ACTIVE.to_vec(),
            ..FindHostsParam::default()
        };
        self.client
            .find_hosts(&param)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| no_host_for(custom_identifier))
    }

    /// Register a host and return the ID assigned by Mackerel.
    ///
    /// # Errors
    /// Returns the transport or HTTP error from the API.
    pub async fn create_host(&self, param: &CreateHostParam) -> Result<String, ApiError> {
        self.client.create_host(param).await
    }

    /// Update the host information on Mackerel.
    ///
    /// # Errors
    /// Returns the transport or HTTP error from the API.
    pub async fn update_host(&self, id: &str, param: &UpdateHostParam) -> Result<(), ApiError> {
        self.client.update_host(id, param).await.map(|_| ())
    }

    /// Change the status of a host.
    ///
    /// # Errors
    /// Returns the transport or HTTP error from the API.
    pub async fn update_host_status(&self, id: &str, status: HostStatus) -> Result<(), ApiError> {
        self.client.update_host_status(id, status).await
    }

    /// Post metric values, in the given order.
    ///
    /// # Errors
    /// Returns the transport or HTTP error from the API.
    pub async fn post_metric_values(&self, values: &[HostMetricValue]) -> Result<(), ApiError> {
        self.client.post_host_metric_values(values).await
    }

    /// Register graph definitions.
    ///
    /// # Errors
    /// Returns the transport or HTTP error from the API.
    pub async fn create_graph_defs(&self, defs: &[GraphDefsParam]) -> Result<(), ApiError> {
        self.client.create_graph_defs(defs).await
    }

    /// Retire a host.
    ///
    /// # Errors
    /// Returns the transport or HTTP error from the API.
    pub async fn retire_host(&self, id: &str) -> Result<(), ApiError> {
        self.client.retire_host(id).await
    }
}

fn user_agent(config: &ApiConfig) -> &str {
    config
        .user_agent
        .as_deref()
        .filter(|ua| !ua.is_empty())
        .unwrap_or(DEFAULT_USER_AGENT)
}

fn build_transport(config: &ApiConfig) -> Result<Transport, ApiError> {
    let base_url = Url::parse(&config.base_url)
        .map_err(|e| ApiError::config(format!("invalid base URL '{}': {e}", config.base_url)))?;
    if config.timeout_ms == 0 {
        return Err(ApiError::config("timeout_ms cannot be 0"));
    }
    let default_headers = config.header_map().map_err(ApiError::config)?;
    Transport::new(
        base_url,
        &config.api_key,
        user_agent(config),
        default_headers,
        config.timeout(),
        config.verbose,
    )
}

fn no_host_for(custom_identifier: &str) -> ApiError {
    ApiError::info(format!(
        "no host was found for the custom identifier: {custom_identifier}"
    ))
}
