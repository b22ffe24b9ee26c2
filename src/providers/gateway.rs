//! Cached, rate-limited access to one provider with mock fallback.
//!
//! # Data Flow
//! ```text
//! Fetch(params):
//!     not live (disabled or no credential) → mock
//!     → cache hit                          → cached data (no rate-limit charge)
//!     → rate limiter rejects               → mock (warn)
//!     → real call fails                    → mock (error, remembered as last error)
//!     → real call succeeds                 → cache with provider TTL → data
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::cache::ResponseCache;
use crate::clock::Clock;
use crate::config::validation::{validate_provider, ValidationError};
use crate::config::{ProviderConfig, ProviderConfigPatch, ProviderKind};
use crate::observability::metrics;
use crate::providers::client::{HttpTransport, ProviderApi};
use crate::security::RateLimiter;

/// Why mock data was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MockReason {
    Disabled,
    RateLimited,
    CallFailed,
    /// Requested directly by a recovery fallback.
    Fallback,
}

/// Where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "reason", rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Live,
    Mock(MockReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiHealthStatus {
    Healthy,
    Disabled,
    /// The last real call failed.
    Degraded,
}

/// Per-provider integration health.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    pub enabled: bool,
    pub request_count: u32,
    pub rate_limit: u32,
    pub cache_size: usize,
    pub last_error: Option<String>,
    pub health_status: ApiHealthStatus,
}

/// Provider-agnostic administration surface of a gateway.
pub trait GatewayControl: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn config(&self) -> ProviderConfig;

    fn health(&self) -> ApiHealth;

    /// Merge a partial update over the current config. Rejected as a whole
    /// when the merged config is invalid.
    fn update_config(&self, patch: &ProviderConfigPatch) -> Result<ProviderConfig, Vec<ValidationError>>;

    /// Swap in an already-validated config.
    fn replace_config(&self, config: ProviderConfig);

    /// Drop this provider's cached responses. Returns how many were removed.
    fn clear_cache(&self) -> usize;
}

pub struct ProviderGateway<P: ProviderApi> {
    api: P,
    config: ArcSwap<ProviderConfig>,
    ttl: Option<Duration>,
    cache: ResponseCache,
    limiter: Arc<RateLimiter>,
    transport: HttpTransport,
    clock: Arc<dyn Clock>,
    last_error: Mutex<Option<String>>,
}

impl<P: ProviderApi> ProviderGateway<P> {
    /// `ttl` of `None` disables caching for this provider.
    pub fn new(
        api: P,
        config: ProviderConfig,
        ttl: Option<Duration>,
        cache: ResponseCache,
        limiter: Arc<RateLimiter>,
        transport: HttpTransport,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            config: ArcSwap::from_pointee(config),
            ttl,
            cache,
            limiter,
            transport,
            clock,
            last_error: Mutex::new(None),
        }
    }

    fn key(&self, params: &P::Params) -> String {
        format!("{}:{}", self.api.kind(), self.api.cache_key(params))
    }

    fn mock(&self, params: &P::Params, reason: MockReason) -> Fetched<P::Data> {
        Fetched {
            data: self.api.mock(params, self.clock.timestamp()),
            source: DataSource::Mock(reason),
        }
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().expect("gateway mutex poisoned") = error;
    }

    /// Mock data for `params` without touching the cache, limiter or network.
    pub fn offline(&self, params: &P::Params) -> Fetched<P::Data> {
        self.mock(params, MockReason::Fallback)
    }

    /// Fetch data for `params`. Never fails: every failure path serves mock data.
    pub async fn fetch(&self, params: &P::Params) -> Fetched<P::Data> {
        let kind = self.api.kind();
        let config = self.config.load_full();

        if !config.is_live() {
            tracing::debug!(provider = %kind, "Provider not live, serving mock data");
            return self.mock(params, MockReason::Disabled);
        }

        let key = self.key(params);
        if self.ttl.is_some() {
            match self.cache.get(&key).map(serde_json::from_value::<P::Data>) {
                Some(Ok(data)) => {
                    metrics::record_cache_lookup(kind.as_str(), true);
                    return Fetched {
                        data,
                        source: DataSource::Cache,
                    };
                }
                Some(Err(e)) => {
                    tracing::warn!(provider = %kind, key = %key, error = %e, "Discarding undecodable cache entry");
                    metrics::record_cache_lookup(kind.as_str(), false);
                }
                None => metrics::record_cache_lookup(kind.as_str(), false),
            }
        }

        if let Err(e) = self.limiter.check_and_increment(kind, config.rate_limit) {
            tracing::warn!(provider = %kind, error = %e, "Serving mock data");
            return self.mock(params, MockReason::RateLimited);
        }

        let started = self.clock.now();
        match self.api.call(&self.transport, &config, params).await {
            Ok(data) => {
                let elapsed = self.clock.now().saturating_duration_since(started);
                metrics::record_provider_call(kind.as_str(), "success", elapsed);
                self.set_last_error(None);

                if let Some(ttl) = self.ttl {
                    match serde_json::to_value(&data) {
                        Ok(value) => self.cache.set(key, value, ttl),
                        Err(e) => tracing::warn!(provider = %kind, error = %e, "Response not cacheable"),
                    }
                }
                Fetched {
                    data,
                    source: DataSource::Live,
                }
            }
            Err(e) => {
                let elapsed = self.clock.now().saturating_duration_since(started);
                metrics::record_provider_call(kind.as_str(), "error", elapsed);
                tracing::error!(provider = %kind, error = %e, "Provider call failed, serving mock data");
                self.set_last_error(Some(e.to_string()));
                self.mock(params, MockReason::CallFailed)
            }
        }
    }
}

impl<P: ProviderApi> GatewayControl for ProviderGateway<P> {
    fn kind(&self) -> ProviderKind {
        self.api.kind()
    }

    fn config(&self) -> ProviderConfig {
        self.config.load().as_ref().clone()
    }

    fn health(&self) -> ApiHealth {
        let kind = self.api.kind();
        let config = self.config.load();
        let last_error = self.last_error.lock().expect("gateway mutex poisoned").clone();

        let health_status = if !config.is_live() {
            ApiHealthStatus::Disabled
        } else if last_error.is_some() {
            ApiHealthStatus::Degraded
        } else {
            ApiHealthStatus::Healthy
        };

        ApiHealth {
            enabled: config.enabled,
            request_count: self.limiter.count(kind),
            rate_limit: config.rate_limit,
            cache_size: self.cache.len_with_prefix(kind.as_str()),
            last_error,
            health_status,
        }
    }

    fn update_config(&self, patch: &ProviderConfigPatch) -> Result<ProviderConfig, Vec<ValidationError>> {
        let kind = self.api.kind();
        let merged = self.config.load().merged(patch);

        let mut errors = Vec::new();
        validate_provider(&mut errors, kind, &merged);
        if !errors.is_empty() {
            return Err(errors);
        }

        self.replace_config(merged.clone());
        Ok(merged)
    }

    fn replace_config(&self, config: ProviderConfig) {
        let kind = self.api.kind();
        tracing::info!(
            provider = %kind,
            enabled = config.enabled,
            live = config.is_live(),
            rate_limit = config.rate_limit,
            timeout_ms = config.timeout_ms,
            "Provider configuration updated"
        );
        if !config.is_live() {
            self.set_last_error(None);
        }
        self.config.store(Arc::new(config));
    }

    fn clear_cache(&self) -> usize {
        let kind = self.api.kind();
        let removed = self.cache.clear_prefix(kind.as_str());
        tracing::info!(provider = %kind, removed, "Provider cache cleared");
        removed
    }
}
