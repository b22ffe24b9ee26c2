//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the resilience gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Fault-tolerant execution settings.
    pub resilience: ResilienceConfig,

    /// Health monitoring cadence, windows and thresholds.
    pub monitoring: MonitoringConfig,

    /// Provider rate limit windowing.
    pub rate_limit: RateLimitConfig,

    /// Response cache TTLs.
    pub cache: CacheConfig,

    /// External API providers.
    pub providers: ProvidersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Coarse feature switches.
    pub features: FeaturesConfig,
}

impl GatewayConfig {
    /// Force every provider off while external APIs are switched off,
    /// whichever source cleared the flag.
    pub fn apply_feature_gates(&mut self) {
        if self.features.external_apis {
            return;
        }
        for kind in ProviderKind::ALL {
            self.providers.get_mut(kind).enabled = false;
        }
    }
}

/// Settings for the recovery coordinator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Deadline applied to every wrapped operation, in milliseconds.
    pub operation_timeout_ms: u64,

    /// Base delay of the recovery backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Upper bound of the recovery backoff in milliseconds.
    pub backoff_max_ms: u64,

    /// Backoff exponent used before invoking the fallback.
    pub recovery_attempt: u32,

    /// Message patterns used to classify opaque errors.
    pub rules: ClassificationRules,
}

impl ResilienceConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 30_000,
            backoff_base_ms: 1_000,
            backoff_max_ms: 10_000,
            recovery_attempt: 1,
            rules: ClassificationRules::default(),
        }
    }
}

/// Case-insensitive regular expressions matched against error messages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassificationRules {
    pub retryable: Vec<String>,
    pub degradable: Vec<String>,
    pub critical: Vec<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        fn owned(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|p| p.to_string()).collect()
        }

        Self {
            retryable: owned(&["timeout", "network", "connection", "ENOTFOUND", "ECONNRESET"]),
            degradable: owned(&["external.*api", "third.*party", "analytics", "intelligence"]),
            critical: owned(&["database", "authentication", "security", "corruption", "fatal"]),
        }
    }
}

/// Health monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Seconds between monitoring ticks.
    pub interval_secs: u64,

    /// Number of response-time samples retained.
    pub response_time_samples: usize,

    /// Number of memory samples retained (one per tick).
    pub memory_samples: usize,

    /// Amount added to a component's error rate on each failure.
    pub error_rate_bump: f64,

    /// Amount subtracted from every component's error rate per tick.
    pub error_rate_decay: f64,

    pub degraded_response_ms: f64,
    pub critical_response_ms: f64,
    pub degraded_error_rate: f64,
    pub critical_error_rate: f64,
    pub degraded_memory_mb: f64,
    pub critical_memory_mb: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            response_time_samples: 100,
            memory_samples: 60,
            error_rate_bump: 0.1,
            error_rate_decay: 0.01,
            degraded_response_ms: 5_000.0,
            critical_response_ms: 15_000.0,
            degraded_error_rate: 0.1,
            critical_error_rate: 0.3,
            degraded_memory_mb: 500.0,
            critical_memory_mb: 1_000.0,
        }
    }
}

/// How a provider's hourly request window is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    /// Window starts at the first accepted request and ends one window later.
    #[default]
    Fixed,
    /// Window is re-anchored on every accepted request; the counter clears
    /// once a full window passes without one.
    Rolling,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    pub window_secs: u64,

    /// Windowing policy.
    pub policy: WindowPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 3_600,
            policy: WindowPolicy::Fixed,
        }
    }
}

/// Cache TTLs per provider. Lead scoring results are never cached.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub analytics_ttl_secs: u64,
    pub search_console_ttl_secs: u64,
    pub competitive_intel_ttl_secs: u64,
}

impl CacheConfig {
    /// TTL for a provider's responses, `None` when the provider must not be cached.
    pub fn ttl_for(&self, kind: ProviderKind) -> Option<Duration> {
        match kind {
            ProviderKind::Analytics => Some(Duration::from_secs(self.analytics_ttl_secs)),
            ProviderKind::SearchConsole => Some(Duration::from_secs(self.search_console_ttl_secs)),
            ProviderKind::CompetitiveIntel => {
                Some(Duration::from_secs(self.competitive_intel_ttl_secs))
            }
            ProviderKind::LeadScoring => None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            analytics_ttl_secs: 300,
            search_console_ttl_secs: 600,
            competitive_intel_ttl_secs: 3_600,
        }
    }
}

/// The external APIs the gateway fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "analytics")]
    Analytics,
    #[serde(rename = "search-console")]
    SearchConsole,
    #[serde(rename = "competitive-intel")]
    CompetitiveIntel,
    #[serde(rename = "lead-scoring")]
    LeadScoring,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Analytics,
        ProviderKind::SearchConsole,
        ProviderKind::CompetitiveIntel,
        ProviderKind::LeadScoring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Analytics => "analytics",
            ProviderKind::SearchConsole => "search-console",
            ProviderKind::CompetitiveIntel => "competitive-intel",
            ProviderKind::LeadScoring => "lead-scoring",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown provider '{}'", s))
    }
}

/// Connection settings for one external API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// When false every fetch is served by the mock generator.
    pub enabled: bool,

    /// API key sent as a bearer token.
    pub credential: Option<String>,

    /// Base URL of the provider API.
    pub base_url: String,

    /// Maximum requests per rate-limit window.
    pub rate_limit: u32,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Transport retries after the first attempt.
    pub retry_attempts: u32,
}

impl ProviderConfig {
    /// Defaults for a provider, matching the production settings.
    pub fn defaults_for(kind: ProviderKind) -> Self {
        let (base_url, rate_limit, timeout_ms, retry_attempts) = match kind {
            ProviderKind::Analytics => ("https://analyticsdata.googleapis.com/v1beta", 100, 30_000, 3),
            ProviderKind::SearchConsole => {
                ("https://searchconsole.googleapis.com/webmasters/v3", 200, 30_000, 3)
            }
            ProviderKind::CompetitiveIntel => ("https://api.competitive-mock.com", 50, 45_000, 2),
            ProviderKind::LeadScoring => ("https://api.lead-scoring-mock.com", 1_000, 15_000, 2),
        };

        Self {
            enabled: false,
            credential: None,
            base_url: base_url.to_string(),
            rate_limit,
            timeout_ms,
            retry_attempts,
        }
    }

    /// Real calls are made only when enabled and a credential is present.
    pub fn is_live(&self) -> bool {
        self.enabled && self.credential.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Return a copy with every field present in `patch` overwritten.
    pub fn merged(&self, patch: &ProviderConfigPatch) -> Self {
        Self {
            enabled: patch.enabled.unwrap_or(self.enabled),
            credential: patch.credential.clone().or_else(|| self.credential.clone()),
            base_url: patch.base_url.clone().unwrap_or_else(|| self.base_url.clone()),
            rate_limit: patch.rate_limit.unwrap_or(self.rate_limit),
            timeout_ms: patch.timeout_ms.unwrap_or(self.timeout_ms),
            retry_attempts: patch.retry_attempts.unwrap_or(self.retry_attempts),
        }
    }
}

/// Partial provider configuration, used by config sections and `UpdateProviderConfig`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
}

impl ProviderConfigPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Provider sections as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderSections {
    analytics: ProviderConfigPatch,
    #[serde(rename = "search-console")]
    search_console: ProviderConfigPatch,
    #[serde(rename = "competitive-intel")]
    competitive_intel: ProviderConfigPatch,
    #[serde(rename = "lead-scoring")]
    lead_scoring: ProviderConfigPatch,
}

/// Fully resolved provider configuration.
///
/// Each section in the file is layered over that provider's own defaults, so a
/// section may set only the fields it cares about.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "ProviderSections")]
pub struct ProvidersConfig {
    pub analytics: ProviderConfig,
    #[serde(rename = "search-console")]
    pub search_console: ProviderConfig,
    #[serde(rename = "competitive-intel")]
    pub competitive_intel: ProviderConfig,
    #[serde(rename = "lead-scoring")]
    pub lead_scoring: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Analytics => &self.analytics,
            ProviderKind::SearchConsole => &self.search_console,
            ProviderKind::CompetitiveIntel => &self.competitive_intel,
            ProviderKind::LeadScoring => &self.lead_scoring,
        }
    }

    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::Analytics => &mut self.analytics,
            ProviderKind::SearchConsole => &mut self.search_console,
            ProviderKind::CompetitiveIntel => &mut self.competitive_intel,
            ProviderKind::LeadScoring => &mut self.lead_scoring,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProviderSections::default().into()
    }
}

impl From<ProviderSections> for ProvidersConfig {
    fn from(sections: ProviderSections) -> Self {
        let resolve = |kind, patch: &ProviderConfigPatch| ProviderConfig::defaults_for(kind).merged(patch);
        Self {
            analytics: resolve(ProviderKind::Analytics, &sections.analytics),
            search_console: resolve(ProviderKind::SearchConsole, &sections.search_console),
            competitive_intel: resolve(ProviderKind::CompetitiveIntel, &sections.competitive_intel),
            lead_scoring: resolve(ProviderKind::LeadScoring, &sections.lead_scoring),
        }
    }
}

/// Feature switches queried through `should_enable_feature`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub analytics: bool,
    pub external_apis: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            analytics: true,
            external_apis: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Verbose diagnostics (the `debug` feature flag).
    pub debug: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            debug: false,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the JSON API.
    pub enabled: bool,

    /// API key for the mutating routes (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,

    /// Request timeout for admin handlers in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let config = GatewayConfig::default();
        let competitive = config.providers.get(ProviderKind::CompetitiveIntel);
        assert_eq!(competitive.rate_limit, 50);
        assert_eq!(competitive.timeout_ms, 45_000);
        assert_eq!(competitive.retry_attempts, 2);
        assert!(!competitive.is_live());
        assert_eq!(config.providers.lead_scoring.rate_limit, 1_000);
    }

    #[test]
    fn test_partial_provider_section_keeps_provider_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [providers.lead-scoring]
            enabled = true
            credential = "secret"
            "#,
        )
        .unwrap();

        let lead = &config.providers.lead_scoring;
        assert!(lead.is_live());
        assert_eq!(lead.rate_limit, 1_000);
        assert_eq!(lead.timeout_ms, 15_000);
        assert_eq!(config.providers.analytics.rate_limit, 100);
    }

    #[test]
    fn test_lead_scoring_is_never_cached() {
        let cache = CacheConfig::default();
        assert_eq!(cache.ttl_for(ProviderKind::LeadScoring), None);
        assert_eq!(cache.ttl_for(ProviderKind::Analytics), Some(Duration::from_secs(300)));
        assert_eq!(cache.ttl_for(ProviderKind::SearchConsole), Some(Duration::from_secs(600)));
        assert_eq!(cache.ttl_for(ProviderKind::CompetitiveIntel), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_provider_kind_round_trip_names() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("google-analytics".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_enabled_without_credential_is_not_live() {
        let mut config = ProviderConfig::defaults_for(ProviderKind::Analytics);
        config.enabled = true;
        assert!(!config.is_live());
        config.credential = Some(String::new());
        assert!(!config.is_live());
    }

    #[test]
    fn test_window_policy_parsing() {
        let config: GatewayConfig = toml::from_str("[rate_limit]\npolicy = \"rolling\"").unwrap();
        assert_eq!(config.rate_limit.policy, WindowPolicy::Rolling);
        assert_eq!(config.rate_limit.window_secs, 3_600);
    }
}
