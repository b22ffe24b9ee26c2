//! The resilience platform: one explicit context owning every component.
//!
//! # Responsibilities
//! - Build the monitor, coordinator, cache, limiter and gateways from config
//! - Expose the downstream interface: execute, health, intelligence,
//!   lead scoring, provider administration, cache clearing
//!
//! # Design Decisions
//! - No process-wide state; tests build as many isolated platforms as they like
//! - The clock, memory sampler and alert sink are injectable through the builder

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::ResponseCache;
use crate::clock::{Clock, TokioClock};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::{GatewayConfig, ProviderConfig, ProviderConfigPatch, ProviderKind};
use crate::health::{HealthMonitor, HealthReport, MemorySampler, ProcessMemorySampler};
use crate::intelligence::{AggregateError, IntelligenceAggregator, IntelligenceSnapshot};
use crate::providers::types::{Lead, LeadScore};
use crate::providers::{
    AnalyticsApi, ApiHealth, CompetitiveApi, Fetched, HttpTransport, LeadScoringApi, ProviderApi,
    ProviderGateway, SearchConsoleApi,
};
use crate::resilience::{AlertSink, EnrichedError, LogAlertSink, OperationError, Outcome, RecoveryCoordinator};
use crate::security::RateLimiter;

/// Component name used when intelligence aggregation runs under the coordinator.
pub const INTELLIGENCE_COMPONENT: &str = "business-intelligence";

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("invalid classification pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Features that can be switched off by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Analytics,
    ExternalApis,
    Debug,
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analytics" => Ok(Feature::Analytics),
            "external-apis" => Ok(Feature::ExternalApis),
            "debug" => Ok(Feature::Debug),
            other => Err(format!("unknown feature '{other}'")),
        }
    }
}

/// Provider settings and health, credential redacted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderView {
    pub enabled: bool,
    pub credential_set: bool,
    pub base_url: String,
    pub rate_limit: u32,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub health: ApiHealth,
}

impl ProviderView {
    fn new(config: ProviderConfig, health: ApiHealth) -> Self {
        Self {
            enabled: config.enabled,
            credential_set: config.credential.as_deref().is_some_and(|c| !c.is_empty()),
            base_url: config.base_url,
            rate_limit: config.rate_limit,
            timeout_ms: config.timeout_ms,
            retry_attempts: config.retry_attempts,
            health,
        }
    }
}

pub struct PlatformBuilder {
    config: GatewayConfig,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemorySampler>,
    alerts: Arc<dyn AlertSink>,
}

impl PlatformBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn memory_sampler(mut self, memory: Arc<dyn MemorySampler>) -> Self {
        self.memory = memory;
        self
    }

    pub fn alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn build(self) -> PlatformResult<ResiliencePlatform> {
        let Self {
            mut config,
            clock,
            memory,
            alerts,
        } = self;
        config.apply_feature_gates();
        validate_config(&config).map_err(PlatformError::InvalidConfig)?;

        let monitor = Arc::new(HealthMonitor::new(config.monitoring.clone(), clock.clone(), memory));
        let coordinator =
            RecoveryCoordinator::new(&config.resilience, monitor.clone(), clock.clone())?.with_alert_sink(alerts);

        let cache = ResponseCache::new(clock.clone());
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit, clock.clone()));
        let transport = HttpTransport::new(clock.clone());

        let parts = GatewayParts {
            config: &config,
            cache: &cache,
            limiter: &limiter,
            transport: &transport,
            clock: &clock,
        };
        let intelligence = IntelligenceAggregator {
            analytics: Arc::new(parts.gateway(AnalyticsApi)),
            search_console: Arc::new(parts.gateway(SearchConsoleApi)),
            competitive: Arc::new(parts.gateway(CompetitiveApi)),
            lead_scoring: Arc::new(parts.gateway(LeadScoringApi)),
        };

        tracing::info!(
            live_providers = ?ProviderKind::ALL
                .into_iter()
                .filter(|k| config.providers.get(*k).is_live())
                .collect::<Vec<_>>(),
            operation_timeout_ms = config.resilience.operation_timeout_ms,
            rate_limit_policy = ?config.rate_limit.policy,
            "Resilience platform initialized"
        );

        Ok(ResiliencePlatform {
            config,
            monitor,
            coordinator,
            cache,
            intelligence,
        })
    }
}

/// Shared pieces every gateway is built from.
struct GatewayParts<'a> {
    config: &'a GatewayConfig,
    cache: &'a ResponseCache,
    limiter: &'a Arc<RateLimiter>,
    transport: &'a HttpTransport,
    clock: &'a Arc<dyn Clock>,
}

impl GatewayParts<'_> {
    fn gateway<P: ProviderApi>(&self, api: P) -> ProviderGateway<P> {
        let kind = api.kind();
        ProviderGateway::new(
            api,
            self.config.providers.get(kind).clone(),
            self.config.cache.ttl_for(kind),
            self.cache.clone(),
            self.limiter.clone(),
            self.transport.clone(),
            self.clock.clone(),
        )
    }
}

pub struct ResiliencePlatform {
    config: GatewayConfig,
    monitor: Arc<HealthMonitor>,
    coordinator: RecoveryCoordinator,
    cache: ResponseCache,
    intelligence: IntelligenceAggregator,
}

impl ResiliencePlatform {
    /// Builder with the production clock, process memory sampler and log alerts.
    pub fn builder(config: GatewayConfig) -> PlatformBuilder {
        PlatformBuilder {
            config,
            clock: Arc::new(TokioClock),
            memory: Arc::new(ProcessMemorySampler::new()),
            alerts: Arc::new(LogAlertSink),
        }
    }

    pub fn new(config: GatewayConfig) -> PlatformResult<Self> {
        Self::builder(config).build()
    }

    /// Configuration the platform was built from. Provider sections may since
    /// have been updated; see [`ResiliencePlatform::provider_config`].
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn intelligence(&self) -> &IntelligenceAggregator {
        &self.intelligence
    }

    /// Run `op` under the recovery coordinator.
    pub async fn execute<T, F, Fut, FB, FbFut>(
        &self,
        op: F,
        fallback: FB,
        component: &str,
        operation: &str,
    ) -> Result<Outcome<T>, EnrichedError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, OperationError>>,
    {
        self.coordinator.execute(op, fallback, component, operation).await
    }

    /// Health snapshot with the cache hit rate brought up to date.
    pub fn health_report(&self) -> HealthReport {
        let stats = self.cache.stats();
        self.monitor.update_cache_metrics(stats.hits, stats.misses);
        self.monitor.report()
    }

    pub fn log_metrics(&self) {
        let stats = self.cache.stats();
        self.monitor.update_cache_metrics(stats.hits, stats.misses);
        self.monitor.log_metrics();
    }

    /// Every provider fetched concurrently; fails only on aggregation errors.
    pub async fn comprehensive_intelligence(&self) -> Result<IntelligenceSnapshot, AggregateError> {
        self.intelligence.fetch_all().await
    }

    /// Intelligence aggregation run under the coordinator: timeouts fall back
    /// to an all-mock snapshot, aggregation failures degrade.
    pub async fn intelligence_or_degraded(&self) -> Result<Outcome<IntelligenceSnapshot>, EnrichedError> {
        let intelligence = &self.intelligence;
        self.execute(
            |_| async move { intelligence.fetch_all().await.map_err(OperationError::from) },
            || async move { Ok(intelligence.offline_snapshot()) },
            INTELLIGENCE_COMPONENT,
            "fetch_all",
        )
        .await
    }

    /// Score leads. Results are never cached.
    pub async fn score_leads(&self, leads: Vec<Lead>) -> Fetched<Vec<LeadScore>> {
        self.intelligence.lead_scoring.fetch(&leads).await
    }

    pub fn api_health(&self) -> BTreeMap<ProviderKind, ApiHealth> {
        self.intelligence.api_health()
    }

    pub fn provider_config(&self, kind: ProviderKind) -> ProviderConfig {
        self.intelligence.gateway(kind).config()
    }

    pub fn providers(&self) -> BTreeMap<ProviderKind, ProviderView> {
        self.intelligence
            .gateways()
            .into_iter()
            .map(|g| (g.kind(), ProviderView::new(g.config(), g.health())))
            .collect()
    }

    pub fn update_provider_config(
        &self,
        kind: ProviderKind,
        patch: &ProviderConfigPatch,
    ) -> PlatformResult<ProviderConfig> {
        self.intelligence
            .gateway(kind)
            .update_config(patch)
            .map_err(PlatformError::InvalidConfig)
    }

    /// `update_provider_config` addressed by provider name.
    pub fn update_provider_config_by_name(
        &self,
        name: &str,
        patch: &ProviderConfigPatch,
    ) -> PlatformResult<ProviderConfig> {
        let kind = ProviderKind::from_str(name).map_err(|_| PlatformError::UnknownProvider(name.to_string()))?;
        self.update_provider_config(kind, patch)
    }

    /// Clear one provider's cached responses, or all of them.
    pub fn clear_cache(&self, provider: Option<ProviderKind>) -> usize {
        match provider {
            Some(kind) => self.intelligence.gateway(kind).clear_cache(),
            None => {
                let removed = self.cache.clear();
                tracing::info!(removed, "Response cache cleared");
                removed
            }
        }
    }

    /// Apply the provider sections of a reloaded config. Returns the
    /// providers whose settings changed.
    pub fn apply_config(&self, config: &GatewayConfig) -> Vec<ProviderKind> {
        let mut config = config.clone();
        config.apply_feature_gates();

        self.intelligence
            .gateways()
            .into_iter()
            .filter_map(|gateway| {
                let kind = gateway.kind();
                let incoming = config.providers.get(kind);
                if gateway.config() == *incoming {
                    return None;
                }
                gateway.replace_config(incoming.clone());
                Some(kind)
            })
            .collect()
    }

    pub fn should_enable_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::Analytics => self.config.features.analytics,
            Feature::ExternalApis => self.config.features.external_apis,
            Feature::Debug => self.config.observability.debug,
        }
    }

    /// Start the monitoring loop.
    pub fn spawn_monitoring(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.monitor.clone().run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::health::FixedMemorySampler;
    use crate::providers::{DataSource, MockReason};

    fn platform(config: GatewayConfig) -> ResiliencePlatform {
        ResiliencePlatform::builder(config)
            .clock(Arc::new(ManualClock::new()))
            .memory_sampler(Arc::new(FixedMemorySampler(128.0)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GatewayConfig::default();
        config.providers.lead_scoring.timeout_ms = 0;
        let err = ResiliencePlatform::builder(config).build().err().unwrap();
        assert!(matches!(err, PlatformError::InvalidConfig(ref errors) if errors.len() == 1));
    }

    #[tokio::test]
    async fn test_default_platform_serves_mocks() {
        let platform = platform(GatewayConfig::default());
        let snapshot = platform.comprehensive_intelligence().await.unwrap();

        assert_eq!(snapshot.analytics.sessions, 1247);
        assert_eq!(snapshot.competitive[0].domain, "generic-competitor.com");
        assert!(snapshot
            .sources
            .values()
            .all(|s| *s == DataSource::Mock(MockReason::Disabled)));
        assert_eq!(snapshot.api_health.len(), 4);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["apiHealth"]["search-console"]["healthStatus"], "disabled");
        assert_eq!(json["apiHealth"]["lead-scoring"]["rateLimit"], 1000);
    }

    #[tokio::test]
    async fn test_intelligence_under_coordinator_succeeds() {
        let platform = platform(GatewayConfig::default());
        let outcome = platform.intelligence_or_degraded().await.unwrap();
        assert!(matches!(outcome, Outcome::Succeeded(_)));
        assert!(platform.health_report().components.contains_key(INTELLIGENCE_COMPONENT));
    }

    #[tokio::test]
    async fn test_score_leads_mock() {
        let platform = platform(GatewayConfig::default());
        let scored = platform.score_leads(vec![Lead::default(), Lead::default()]).await;
        assert_eq!(scored.data.len(), 2);
        assert_eq!(scored.data[1].lead_id, "mock_lead_1");
    }

    #[test]
    fn test_update_provider_by_name() {
        let platform = platform(GatewayConfig::default());
        let patch = ProviderConfigPatch {
            enabled: Some(true),
            credential: Some("secret".into()),
            rate_limit: Some(5),
            ..Default::default()
        };

        let updated = platform.update_provider_config_by_name("search-console", &patch).unwrap();
        assert!(updated.is_live());
        assert_eq!(platform.provider_config(ProviderKind::SearchConsole).rate_limit, 5);

        let providers = platform.providers();
        let view = &providers[&ProviderKind::SearchConsole];
        assert!(view.credential_set);
        assert_eq!(view.health.health_status, crate::providers::ApiHealthStatus::Healthy);

        assert!(matches!(
            platform.update_provider_config_by_name("weather", &patch),
            Err(PlatformError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_apply_config_reports_changed_providers() {
        let platform = platform(GatewayConfig::default());
        let mut reloaded = GatewayConfig::default();
        reloaded.providers.analytics.rate_limit = 7;

        assert_eq!(platform.apply_config(&reloaded), vec![ProviderKind::Analytics]);
        assert!(platform.apply_config(&reloaded).is_empty());
    }

    #[test]
    fn test_feature_flags() {
        let mut config = GatewayConfig::default();
        config.features.external_apis = false;
        let platform = platform(config);

        assert!(platform.should_enable_feature(Feature::Analytics));
        assert!(!platform.should_enable_feature(Feature::ExternalApis));
        assert!(!platform.should_enable_feature("debug".parse().unwrap()));
        assert!("weather".parse::<Feature>().is_err());
    }

    #[test]
    fn test_external_api_switch_disables_providers() {
        let mut config = GatewayConfig::default();
        config.providers.analytics.enabled = true;
        config.providers.analytics.credential = Some("ga-key".into());
        config.features.external_apis = false;
        let platform = platform(config);
        assert!(!platform.provider_config(ProviderKind::Analytics).is_live());

        let mut reloaded = GatewayConfig::default();
        reloaded.features.external_apis = false;
        reloaded.providers.search_console.enabled = true;
        reloaded.providers.search_console.credential = Some("sc-key".into());
        reloaded.providers.search_console.rate_limit = 9;

        assert_eq!(platform.apply_config(&reloaded), vec![ProviderKind::SearchConsole]);
        let search = platform.provider_config(ProviderKind::SearchConsole);
        assert!(!search.enabled);
        assert_eq!(search.rate_limit, 9);
    }
}
