//! ARM REST client
//!
//! Thin wrapper over `reqwest` that adds the `api-version` query parameter and
//! bearer token, retries transient failures, decodes the ARM error envelope and
//! polls long-running operations.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use stratus_core::provider::{ErrorKind, ProviderError};
use url::Url;

use crate::auth::Credential;
use crate::config::ProviderConfig;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Upper bound for a single retry or poll delay
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Truncate a response body and strip control characters before logging it
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

#[derive(Debug, thiserror::Error)]
pub enum ArmError {
    #[error("unexpected status {status} with error: {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("the long-running operation ended with status {status:?}: {code}: {message}")]
    OperationFailed {
        status: String,
        code: String,
        message: String,
    },

    #[error("sending request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("authenticating: {0}")]
    Auth(String),

    #[error("building request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ArmError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ArmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Build from a non-success response, reading the `{"error": {...}}` envelope
    fn from_response(status: u16, text: &str) -> Self {
        let envelope: Option<Value> = serde_json::from_str(text).ok();
        let error = envelope.as_ref().map(|v| v.get("error").unwrap_or(v));
        let field = |name: &str| {
            error
                .and_then(|e| e.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        ArmError::Api {
            status,
            code: field("code").unwrap_or_else(|| "Unknown".to_string()),
            message: field("message").unwrap_or_else(|| sanitize_for_log(text)),
        }
    }

    /// Wrap into a provider error, adding what was being attempted
    pub fn wrap(self, context: impl Into<String>) -> ProviderError {
        let kind = if self.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::Api
        };
        ProviderError::new(context).with_kind(kind).with_cause(self)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// A response with its body still as text
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: u16,
    pub text: String,
    url: String,
    async_operation: Option<String>,
    location: Option<String>,
    retry_after: Option<Duration>,
}

impl ArmResponse {
    fn error_for_status(self) -> Result<Self, ArmError> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            log::debug!(
                "API error: {} - {}",
                self.status,
                sanitize_for_log(&self.text)
            );
            Err(ArmError::from_response(self.status, &self.text))
        }
    }

    /// Decode the body; an empty body yields `None`
    pub fn json(&self) -> Result<Option<Value>, ArmError> {
        if self.text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.text)
            .map(Some)
            .map_err(|source| ArmError::Decode {
                url: self.url.clone(),
                source,
            })
    }
}

/// HTTP client for the Azure Resource Manager API
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    credential: Arc<Credential>,
    max_retries: u32,
    retry_base_delay: Duration,
    poll_interval: Duration,
}

impl ArmClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ArmError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("stratus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ArmError::Transport {
                url: config.endpoint.to_string(),
                source,
            })?;
        let credential = Credential::from_config(config, http.clone())?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            credential: Arc::new(credential),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_secs(1),
            poll_interval: config.poll_interval,
        })
    }

    /// Base delay of the exponential retry backoff
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn url(&self, path: &str, api_version: &str) -> Result<Url, ArmError> {
        let mut url = self.endpoint.join(path.trim_start_matches('/'))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_DELAY)
    }

    // =========================================================================
    // Resource operations
    // =========================================================================

    /// GET a resource; a 404 yields `None`
    pub async fn get(&self, path: &str, api_version: &str) -> Result<Option<Value>, ArmError> {
        let url = self.url(path, api_version)?;
        self.get_url(url).await
    }

    async fn get_url(&self, url: Url) -> Result<Option<Value>, ArmError> {
        let response = self.send(Method::GET, url, None).await?;
        if response.status == 404 {
            return Ok(None);
        }
        response.error_for_status()?.json()
    }

    /// GET a collection, following `nextLink` pages
    pub async fn list(&self, path: &str, api_version: &str) -> Result<Vec<Value>, ArmError> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, api_version)?);

        while let Some(url) = next.take() {
            let Some(page) = self.get_url(url).await? else {
                break;
            };
            if let Some(Value::Array(values)) = page.get("value") {
                items.extend(values.iter().cloned());
            }
            next = page
                .get("nextLink")
                .and_then(Value::as_str)
                .map(Url::parse)
                .transpose()?;
        }

        Ok(items)
    }

    pub async fn put(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
    ) -> Result<ArmResponse, ArmError> {
        let url = self.url(path, api_version)?;
        self.send(Method::PUT, url, Some(body))
            .await?
            .error_for_status()
    }

    pub async fn put_then_poll(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
    ) -> Result<(), ArmError> {
        let response = self.put(path, api_version, body).await?;
        self.poll(response).await
    }

    pub async fn patch(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
    ) -> Result<ArmResponse, ArmError> {
        let url = self.url(path, api_version)?;
        self.send(Method::PATCH, url, Some(body))
            .await?
            .error_for_status()
    }

    pub async fn patch_then_poll(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
    ) -> Result<(), ArmError> {
        let response = self.patch(path, api_version, body).await?;
        self.poll(response).await
    }

    pub async fn post(
        &self,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
    ) -> Result<ArmResponse, ArmError> {
        let url = self.url(path, api_version)?;
        self.send(Method::POST, url, body).await?.error_for_status()
    }

    /// DELETE a resource; a resource that is already gone is not an error
    pub async fn delete(&self, path: &str, api_version: &str) -> Result<Option<ArmResponse>, ArmError> {
        let url = self.url(path, api_version)?;
        let response = self.send(Method::DELETE, url, None).await?;
        if response.status == 404 {
            return Ok(None);
        }
        response.error_for_status().map(Some)
    }

    pub async fn delete_then_poll(&self, path: &str, api_version: &str) -> Result<(), ArmError> {
        match self.delete(path, api_version).await? {
            Some(response) => self.poll(response).await,
            None => Ok(()),
        }
    }

    // =========================================================================
    // Long-running operations
    // =========================================================================

    /// Wait for the operation started by `response` to finish
    async fn poll(&self, response: ArmResponse) -> Result<(), ArmError> {
        if let Some(operation) = response.async_operation.clone() {
            return self
                .poll_async_operation(&operation, response.retry_after)
                .await;
        }
        if response.status == 202
            && let Some(location) = response.location.clone()
        {
            return self.poll_location(&location, response.retry_after).await;
        }
        Ok(())
    }

    /// Poll an `Azure-AsyncOperation` URL until its status is terminal
    async fn poll_async_operation(
        &self,
        operation: &str,
        mut retry_after: Option<Duration>,
    ) -> Result<(), ArmError> {
        let url = Url::parse(operation)?;
        loop {
            tokio::time::sleep(self.poll_delay(retry_after)).await;

            let response = self
                .send(Method::GET, url.clone(), None)
                .await?
                .error_for_status()?;
            retry_after = response.retry_after;
            let body = response.json()?.unwrap_or(Value::Null);
            let status = body
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("InProgress");

            log::debug!("operation {} is {}", url.path(), status);
            if status.eq_ignore_ascii_case("Succeeded") {
                return Ok(());
            }
            if status.eq_ignore_ascii_case("Failed") || status.eq_ignore_ascii_case("Canceled") {
                let error = body.get("error");
                let field = |name: &str| {
                    error
                        .and_then(|e| e.get(name))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                return Err(ArmError::OperationFailed {
                    status: status.to_string(),
                    code: field("code"),
                    message: field("message"),
                });
            }
        }
    }

    /// Poll a `Location` URL until it stops answering 202
    async fn poll_location(
        &self,
        location: &str,
        mut retry_after: Option<Duration>,
    ) -> Result<(), ArmError> {
        let url = Url::parse(location)?;
        loop {
            tokio::time::sleep(self.poll_delay(retry_after)).await;

            let response = self.send(Method::GET, url.clone(), None).await?;
            if response.status != 202 {
                // a deleted resource answers 404 once the operation completes
                if response.status == 404 {
                    return Ok(());
                }
                return response.error_for_status().map(|_| ());
            }
            retry_after = response.retry_after;
        }
    }

    fn poll_delay(&self, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or(self.poll_interval).min(MAX_DELAY)
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Send a request, retrying throttling, server errors and connection failures
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<ArmResponse, ArmError> {
        let mut attempt = 0;
        loop {
            let result = self.send_once(method.clone(), url.clone(), body).await;

            let retry = match &result {
                Ok(response) if is_retryable_status(response.status) => {
                    Some((response.retry_after, format!("status {}", response.status)))
                }
                Err(ArmError::Transport { source, .. }) => Some((None, source.to_string())),
                _ => None,
            };

            match retry {
                Some((hint, reason)) if attempt < self.max_retries => {
                    let delay = hint.unwrap_or_else(|| self.backoff(attempt)).min(MAX_DELAY);
                    attempt += 1;
                    log::warn!(
                        "{} {} failed with {} (attempt {}/{}), retrying in {}ms",
                        method,
                        url.path(),
                        reason,
                        attempt,
                        self.max_retries + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => return result,
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<ArmResponse, ArmError> {
        let token = self.credential.token().await?;
        log::debug!("{} {}", method, url);

        let mut request = self.http.request(method, url.clone()).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ArmError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let async_operation = header("azure-asyncoperation");
        let location = header("location");
        let retry_after = header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let text = response.text().await.map_err(|source| ArmError::Transport {
            url: url.to_string(),
            source,
        })?;

        Ok(ArmResponse {
            status,
            text,
            url: url.to_string(),
            async_operation,
            location,
            retry_after,
        })
    }
}
