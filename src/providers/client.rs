//! Provider API abstraction and the shared HTTP transport.
//!
//! # Responsibilities
//! - Define what a provider integration supplies: cache key, real call, mock
//! - Send authenticated JSON requests with a per-attempt timeout
//! - Retry transient transport failures with jittered backoff
//!
//! # Design Decisions
//! - Only timeouts, connection failures and 5xx responses are retried
//! - Backoff sleeps go through the injected clock
//! - Errors here never reach `Fetch` callers; the gateway turns them into mocks

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::clock::Clock;
use crate::config::{ProviderConfig, ProviderKind};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::OperationError;
use crate::security::RateLimitError;

const RETRY_BASE_MS: u64 = 100;
const RETRY_MAX_MS: u64 = 2_000;

/// Errors that can occur while calling a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider is enabled but no credential is configured.
    #[error("{0} has no credential configured")]
    MissingCredential(ProviderKind),

    /// The configured base URL and path do not form a valid URL.
    #[error("{provider} URL '{url}' is invalid: {reason}")]
    InvalidUrl {
        provider: ProviderKind,
        url: String,
        reason: String,
    },

    /// A single attempt exceeded the provider timeout.
    #[error("{provider} request timeout after {ms}ms")]
    Timeout { provider: ProviderKind, ms: u64 },

    /// The provider answered with a non-success status.
    #[error("{provider} returned HTTP {status}")]
    Status { provider: ProviderKind, status: u16 },

    /// Connection-level failure.
    #[error("{provider} network error: {message}")]
    Transport { provider: ProviderKind, message: String },

    /// The body was not the expected JSON shape.
    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: ProviderKind, message: String },

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
}

impl ProviderError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout { .. } | ProviderError::Transport { .. } => true,
            ProviderError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for OperationError {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err {
            ProviderError::Status { status: 401 | 403, .. } => OperationError::Critical(message),
            e if e.is_transient() => OperationError::Retryable(message),
            ProviderError::MissingCredential(_) | ProviderError::RateLimited(_) | ProviderError::Status { .. } => {
                OperationError::Degradable(message)
            }
            _ => OperationError::Opaque(message),
        }
    }
}

/// One external API integration.
#[async_trait]
pub trait ProviderApi: Send + Sync + 'static {
    type Params: Send + Sync;
    type Data: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    fn kind(&self) -> ProviderKind;

    /// Key suffix identifying `params`; the gateway prefixes the provider name.
    fn cache_key(&self, params: &Self::Params) -> String;

    /// Perform the real call.
    async fn call(
        &self,
        transport: &HttpTransport,
        config: &ProviderConfig,
        params: &Self::Params,
    ) -> ProviderResult<Self::Data>;

    /// Deterministic stand-in data shaped like a real response.
    fn mock(&self, params: &Self::Params, now: DateTime<Utc>) -> Self::Data;
}

/// reqwest client shared by every provider.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl HttpTransport {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            client: reqwest::Client::new(),
            clock,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
        path: &str,
    ) -> ProviderResult<T> {
        self.send(kind, config, Method::GET, path, |req| req).await
    }

    pub async fn post_json<B, T>(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
        path: &str,
        body: &B,
    ) -> ProviderResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.send(kind, config, Method::POST, path, |req| req.json(body)).await
    }

    async fn send<T, F>(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
        method: Method,
        path: &str,
        with_body: F,
    ) -> ProviderResult<T>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let credential = config
            .credential
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(ProviderError::MissingCredential(kind))?;
        let url = endpoint(kind, &config.base_url, path)?;

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let delay = calculate_backoff(attempt, RETRY_BASE_MS, RETRY_MAX_MS);
                tracing::debug!(provider = %kind, attempt, delay_ms = delay.as_millis() as u64, "Retrying provider call");
                self.clock.sleep(delay).await;
            }

            let request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(credential)
                .timeout(config.timeout());

            match self.attempt(kind, config, with_body(request)).await {
                Ok(data) => return Ok(data),
                Err(e) if e.is_transient() && attempt < config.retry_attempts => {
                    tracing::warn!(provider = %kind, attempt, error = %e, "Provider call failed, will retry");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
        request: RequestBuilder,
    ) -> ProviderResult<T> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: kind,
                    ms: config.timeout_ms,
                }
            } else {
                ProviderError::Transport {
                    provider: kind,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: kind,
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: kind,
                    ms: config.timeout_ms,
                }
            } else {
                ProviderError::Decode {
                    provider: kind,
                    message: e.to_string(),
                }
            }
        })
    }
}

/// Join `path` onto `base`, keeping any path the base already has.
fn endpoint(kind: ProviderKind, base: &str, path: &str) -> ProviderResult<Url> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| ProviderError::InvalidUrl {
        provider: kind,
        url: joined,
        reason: e.to_string(),
    })
}
