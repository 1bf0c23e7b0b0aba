//! HTTP request execution.
//!
//! [`RequestExecutor`] sends one logical API call: it takes a rate permit
//! before every attempt, retries transient failures with backoff, and
//! decodes the body according to its declared content type.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use url::Url;

use crate::client::ClientError;
use crate::config::ClientConfig;
use crate::models::{ContentKind, RawResponse};
use crate::utils::rate_limit::RateLimiter;
use crate::utils::retry::{with_retry, AttemptError, RetryConfig, TransientError};
use crate::utils::validate::validate_base_url;
use crate::utils::xml::xml_to_value;

/// One logical API call, relative to the executor's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Path below the base URL, e.g. `search` or `MED/123/citations`
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub method: Method,
    /// JSON body, sent with POST requests
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
            method: Method::GET,
            body: None,
        }
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
            method: Method::POST,
            body: Some(body),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Rate-limited, retrying HTTP executor shared by all client operations
///
/// Cloning is cheap; clones share the connection pool and the rate limiter.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Arc<Client>,
    base_url: Url,
    limiter: Arc<RateLimiter>,
    retry: RetryConfig,
}

impl RequestExecutor {
    /// Build an executor from a client configuration
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        let limiter = RateLimiter::per_second(config.requests_per_second, config.burst)?;

        Ok(Self {
            client: Arc::new(client),
            base_url: validate_base_url(&config.base_url)?,
            limiter: Arc::new(limiter),
            retry: config.retry_config(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// Absolute URL for an endpoint path
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Execute a request with rate limiting and retries
    pub async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ClientError> {
        let url = self.endpoint_url(&request.endpoint)?;
        let url = &url;

        with_retry(self.retry, || async move {
            self.limiter.acquire().await;
            self.send_once(url, request).await
        })
        .await
    }

    /// Like [`execute`](Self::execute), abandoning the call at `deadline`
    pub async fn execute_until(
        &self,
        request: &ApiRequest,
        deadline: Instant,
    ) -> Result<RawResponse, ClientError> {
        with_deadline(deadline, self.execute(request)).await
    }

    async fn send_once(&self, url: &Url, request: &ApiRequest) -> Result<RawResponse, AttemptError> {
        let mut builder = self.client.request(request.method.clone(), url.clone());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %url, "Sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| TransientError::from_reqwest_error(&e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let text = response
            .text()
            .await
            .map_err(|e| TransientError::from_reqwest_error(&e))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), url = %url, "Request failed");
            return Err(match TransientError::from_status(status, &text) {
                Some(transient) => AttemptError::Transient(transient),
                None => AttemptError::Permanent(ClientError::HttpStatus {
                    status: status.as_u16(),
                    body: text,
                }),
            });
        }

        Ok(decode_body(&content_type, text)?)
    }
}

/// Decode a successful response body by its `Content-Type`
pub fn decode_body(content_type: &str, text: String) -> Result<RawResponse, ClientError> {
    match ContentKind::from_content_type(content_type) {
        ContentKind::Json => Ok(RawResponse::json(content_type, serde_json::from_str(&text)?)),
        ContentKind::Xml => Ok(RawResponse::xml(content_type, xml_to_value(&text)?)),
        ContentKind::Text => Ok(RawResponse::text(content_type, text)),
    }
}

/// Run `future`, failing with [`ClientError::DeadlineExceeded`] at `deadline`.
///
/// The future is dropped when the deadline passes; a rate permit it was
/// still waiting for is returned to the limiter.
pub async fn with_deadline<T, F>(deadline: Instant, future: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    timeout_at(deadline, future)
        .await
        .map_err(|_| ClientError::DeadlineExceeded)?
}
