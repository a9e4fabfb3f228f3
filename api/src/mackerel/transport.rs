//! Request dispatch shared by every Mackerel API call.
//!
//! [`Transport`] owns the immutable request settings. Each call goes
//! through [`Transport::execute`], which:
//!
//! 1. appends the configured default headers (every value kept),
//! 2. sets `X-Api-Key` and `User-Agent`, replacing earlier values,
//! 3. applies the request timeout,
//! 4. dumps the request and response at trace level in verbose mode,
//! 5. reads the whole response body before returning.

use std::fmt::{self, Write as _};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, Request, StatusCode, Url, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::ApiError;

/// Header carrying the API key.
pub const X_API_KEY: &str = "x-api-key";

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "mackerel-agent/0.0.0";

/// Request timeout in milliseconds applied when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// [`DEFAULT_TIMEOUT_MS`] as a [`Duration`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);

/// Tracing target of the verbose traffic dumps.
pub const DUMP_TARGET: &str = "mackerel_agent_api::transport";

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Immutable request settings plus the HTTP client that sends them.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    api_key: HeaderValue,
    user_agent: HeaderValue,
    default_headers: HeaderMap,
    timeout: Duration,
    verbose: bool,
}

impl Transport {
    /// Build a transport for `base_url`.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the API key or user agent is not a
    /// valid header value, or if the HTTP client cannot be built.
    pub fn new(
        base_url: Url,
        api_key: &str,
        user_agent: &str,
        default_headers: HeaderMap,
        timeout: Duration,
        verbose: bool,
    ) -> Result<Self, ApiError> {
        let mut api_key = HeaderValue::from_str(api_key)
            .map_err(|_| ApiError::config("API key is not a valid header value"))?;
        api_key.set_sensitive(true);
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| ApiError::config(format!("invalid user agent: {e}")))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key,
            user_agent,
            default_headers,
            timeout,
            verbose,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Base URL with `path` and raw `query` substituted. The stored base
    /// URL is left untouched.
    #[must_use]
    pub fn url_for(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }

    /// Start a request against `url`.
    #[must_use]
    pub fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http.request(method, url)
    }

    /// Send a request and read the whole response, whatever its status.
    ///
    /// # Errors
    /// Returns [`ApiError::Request`] if the request cannot be built, sent,
    /// or its body read (including timeouts).
    pub async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<ApiResponse, ApiError> {
        let mut request = builder.timeout(self.timeout).build()?;
        let headers = request.headers_mut();
        for (name, value) in &self.default_headers {
            headers.append(name.clone(), value.clone());
        }
        headers.insert(HeaderName::from_static(X_API_KEY), self.api_key.clone());
        headers.insert(USER_AGENT, self.user_agent.clone());

        if self.verbose {
            if let Ok(dump) = dump_request(&request) {
                tracing::trace!(target: DUMP_TARGET, "{dump}");
            }
        }

        let method = request.method().clone();
        let url = request.url().clone();
        let response = self.http.execute(request).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(%method, %url, status = status.as_u16(), "mackerel API call");

        let response = ApiResponse {
            status,
            version,
            headers,
            body,
        };
        if self.verbose {
            if let Ok(dump) = dump_response(&response) {
                tracing::trace!(target: DUMP_TARGET, "{dump}");
            }
        }
        Ok(response)
    }

    /// Send a request and decode a successful JSON response.
    ///
    /// # Errors
    /// Returns [`ApiError::Http`] for non-2xx statuses, [`ApiError::Decode`]
    /// for unexpected bodies and [`ApiError::Request`] for transport failures.
    pub async fn call<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        if !response.status.is_success() {
            return Err(ApiError::from_response(
                response.status.as_u16(),
                &response.body,
            ));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Send `body` as JSON with `method` to `path` and decode the reply.
    ///
    /// # Errors
    /// See [`Transport::call`].
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url_for(path, None);
        self.call(self.request(method, url).json(body)).await
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap) -> fmt::Result {
    for (name, value) in headers {
        if value.is_sensitive() {
            writeln!(out, "{name}: [redacted]\r")?;
        } else {
            writeln!(out, "{name}: {}\r", String::from_utf8_lossy(value.as_bytes()))?;
        }
    }
    Ok(())
}

/// Wire-like rendering of an outgoing request.
pub(crate) fn dump_request(request: &Request) -> Result<String, fmt::Error> {
    let url = request.url();
    let mut out = String::new();
    write!(out, "{} {}", request.method(), url.path())?;
    if let Some(query) = url.query() {
        write!(out, "?{query}")?;
    }
    writeln!(out, " {:?}\r", request.version())?;
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => writeln!(out, "host: {host}:{port}\r")?,
            None => writeln!(out, "host: {host}\r")?,
        }
    }
    write_headers(&mut out, request.headers())?;
    writeln!(out, "\r")?;
    if let Some(body) = request.body().and_then(reqwest::Body::as_bytes) {
        out.push_str(&String::from_utf8_lossy(body));
    }
    Ok(out)
}

/// Wire-like rendering of a received response.
pub(crate) fn dump_response(response: &ApiResponse) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{:?} {}\r", response.version, response.status)?;
    write_headers(&mut out, &response.headers)?;
    writeln!(out, "\r")?;
    out.push_str(&String::from_utf8_lossy(&response.body));
    Ok(out)
}
