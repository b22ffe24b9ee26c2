//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, LogFormat, ProviderKind};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> ConfigResult<GatewayConfig> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Load `path` if it exists, otherwise start from defaults. Environment
/// overrides and validation apply either way.
pub fn load_or_default(path: &Path) -> ConfigResult<GatewayConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        parse_config("", |key| std::env::var(key).ok())
    }
}

/// Parse TOML text, apply overrides from `env`, and validate.
pub fn parse_config<F>(content: &str, env: F) -> ConfigResult<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);
    config.apply_feature_gates();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Environment variable names for a provider: (enabled, credential, url).
fn provider_env(kind: ProviderKind) -> (&'static str, &'static str, Option<&'static str>) {
    match kind {
        ProviderKind::Analytics => ("GOOGLE_ANALYTICS_ENABLED", "GOOGLE_ANALYTICS_API_KEY", None),
        ProviderKind::SearchConsole => ("SEARCH_CONSOLE_ENABLED", "SEARCH_CONSOLE_API_KEY", None),
        ProviderKind::CompetitiveIntel => (
            "COMPETITIVE_INTEL_ENABLED",
            "COMPETITIVE_INTEL_API_KEY",
            Some("COMPETITIVE_INTEL_URL"),
        ),
        ProviderKind::LeadScoring => {
            ("LEAD_SCORING_ENABLED", "LEAD_SCORING_API_KEY", Some("LEAD_SCORING_URL"))
        }
    }
}

/// Layer environment variables over the file configuration.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    for kind in ProviderKind::ALL {
        let (enabled_var, key_var, url_var) = provider_env(kind);
        let provider = config.providers.get_mut(kind);

        if let Some(value) = env(enabled_var) {
            provider.enabled = value.eq_ignore_ascii_case("true");
        }
        if let Some(key) = env(key_var).filter(|k| !k.is_empty()) {
            provider.credential = Some(key);
        }
        if let Some(url) = url_var.and_then(&env) {
            provider.base_url = url;
        }
    }

    if env("ENABLE_ANALYTICS").is_some_and(|v| v == "false") {
        config.features.analytics = false;
    }
    // Global kill switch for external traffic.
    if env("ENABLE_EXTERNAL_APIS").is_some_and(|v| v == "false") {
        config.features.external_apis = false;
    }

    if let Some(level) = env("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(format) = env("LOG_FORMAT") {
        config.observability.log_format = match format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
    }
    if env("DEBUG").is_some_and(|v| v == "true") {
        config.observability.debug = true;
    }
    match env("REQUEST_TIMEOUT").map(|v| v.parse::<u64>()) {
        Some(Ok(ms)) => config.resilience.operation_timeout_ms = ms,
        Some(Err(e)) => tracing::warn!(error = %e, "Ignoring unparsable REQUEST_TIMEOUT"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_enables_provider_with_credential() {
        let config = parse_config(
            "",
            env_from(&[
                ("GOOGLE_ANALYTICS_ENABLED", "true"),
                ("GOOGLE_ANALYTICS_API_KEY", "ga-key"),
                ("LEAD_SCORING_URL", "http://127.0.0.1:9999"),
            ]),
        )
        .unwrap();

        assert!(config.providers.analytics.is_live());
        assert_eq!(config.providers.analytics.credential.as_deref(), Some("ga-key"));
        assert_eq!(config.providers.lead_scoring.base_url, "http://127.0.0.1:9999");
        assert!(!config.providers.search_console.enabled);
    }

    #[test]
    fn test_external_api_kill_switch() {
        let config = parse_config(
            "[providers.competitive-intel]\nenabled = true\ncredential = \"k\"",
            env_from(&[("ENABLE_EXTERNAL_APIS", "false")]),
        )
        .unwrap();
        assert!(!config.providers.competitive_intel.enabled);
        assert!(!config.features.external_apis);
        assert!(config.features.analytics);
    }

    #[test]
    fn test_external_api_switch_in_file() {
        let config = parse_config(
            "[features]\nexternal_apis = false\n\n[providers.search-console]\nenabled = true\ncredential = \"k\"",
            env_from(&[]),
        )
        .unwrap();
        assert!(!config.features.external_apis);
        assert!(!config.providers.search_console.enabled);
        assert!(!config.providers.search_console.is_live());
    }

    #[test]
    fn test_request_timeout_override() {
        let config = parse_config("", env_from(&[("REQUEST_TIMEOUT", "5000"), ("LOG_LEVEL", "debug")])).unwrap();
        assert_eq!(config.resilience.operation_timeout_ms, 5_000);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let err = parse_config("[rate_limit]\nwindow_secs = 0", env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("rate_limit.window_secs"));

        let err = parse_config("[rate_limit\n", env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_provider_section_is_rejected() {
        let err = parse_config("[providers.crm]\nenabled = true", env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("crm"));
    }
}
