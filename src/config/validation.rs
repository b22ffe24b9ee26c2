//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, thresholds ordered)
//! - Check provider base URLs and classification patterns compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{GatewayConfig, ProviderConfig, ProviderKind};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl { field: String, value: String, reason: String },

    #[error("{field}: critical threshold {critical} is below degraded threshold {degraded}")]
    ThresholdOrder { field: String, degraded: f64, critical: f64 },

    #[error("{field}: {value} is outside [0, 1]")]
    OutOfUnitRange { field: String, value: f64 },

    #[error("{field}: invalid pattern '{pattern}': {reason}")]
    InvalidPattern { field: String, pattern: String, reason: String },

    #[error("{field}: backoff base {base_ms}ms exceeds maximum {max_ms}ms")]
    BackoffOrder { field: String, base_ms: u64, max_ms: u64 },
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let resilience = &config.resilience;
    non_zero(&mut errors, "resilience.operation_timeout_ms", resilience.operation_timeout_ms);
    non_zero(&mut errors, "resilience.backoff_max_ms", resilience.backoff_max_ms);
    if resilience.backoff_base_ms > resilience.backoff_max_ms {
        errors.push(ValidationError::BackoffOrder {
            field: "resilience".into(),
            base_ms: resilience.backoff_base_ms,
            max_ms: resilience.backoff_max_ms,
        });
    }
    for (field, patterns) in [
        ("resilience.rules.retryable", &resilience.rules.retryable),
        ("resilience.rules.degradable", &resilience.rules.degradable),
        ("resilience.rules.critical", &resilience.rules.critical),
    ] {
        for pattern in patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError::InvalidPattern {
                    field: field.into(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let monitoring = &config.monitoring;
    non_zero(&mut errors, "monitoring.interval_secs", monitoring.interval_secs);
    non_zero(&mut errors, "monitoring.response_time_samples", monitoring.response_time_samples as u64);
    non_zero(&mut errors, "monitoring.memory_samples", monitoring.memory_samples as u64);
    for (field, value) in [
        ("monitoring.error_rate_bump", monitoring.error_rate_bump),
        ("monitoring.error_rate_decay", monitoring.error_rate_decay),
        ("monitoring.degraded_error_rate", monitoring.degraded_error_rate),
        ("monitoring.critical_error_rate", monitoring.critical_error_rate),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::OutOfUnitRange { field: field.into(), value });
        }
    }
    for (field, degraded, critical) in [
        ("monitoring.response_ms", monitoring.degraded_response_ms, monitoring.critical_response_ms),
        ("monitoring.error_rate", monitoring.degraded_error_rate, monitoring.critical_error_rate),
        ("monitoring.memory_mb", monitoring.degraded_memory_mb, monitoring.critical_memory_mb),
    ] {
        if critical < degraded {
            errors.push(ValidationError::ThresholdOrder { field: field.into(), degraded, critical });
        }
    }

    non_zero(&mut errors, "rate_limit.window_secs", config.rate_limit.window_secs);

    for kind in ProviderKind::ALL {
        validate_provider(&mut errors, kind, config.providers.get(kind));
    }

    if config.admin.enabled {
        non_zero(&mut errors, "admin.request_timeout_secs", config.admin.request_timeout_secs);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key".into() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one provider's settings.
pub fn validate_provider(errors: &mut Vec<ValidationError>, kind: ProviderKind, provider: &ProviderConfig) {
    let prefix = format!("providers.{}", kind);
    non_zero(errors, &format!("{}.rate_limit", prefix), provider.rate_limit as u64);
    non_zero(errors, &format!("{}.timeout_ms", prefix), provider.timeout_ms);
    if let Err(e) = url::Url::parse(&provider.base_url) {
        errors.push(ValidationError::InvalidUrl {
            field: format!("{}.base_url", prefix),
            value: provider.base_url.clone(),
            reason: e.to_string(),
        });
    }
}

fn non_zero(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field: field.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.providers.analytics.rate_limit = 0;
        config.providers.search_console.base_url = "not a url".into();
        config.monitoring.critical_response_ms = 1_000.0;
        config.rate_limit.window_secs = 0;
        config.resilience.rules.critical.push("(unclosed".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::Zero {
            field: "providers.analytics.rate_limit".into()
        }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidUrl { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidPattern { .. })));
    }

    #[test]
    fn test_admin_key_required_when_enabled() {
        let mut config = GatewayConfig::default();
        config.admin.api_key = String::new();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::Empty { field: "admin.api_key".into() }])
        );

        config.admin.enabled = false;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::Zero { field: "rate_limit.window_secs".into() };
        assert_eq!(err.to_string(), "rate_limit.window_secs must be greater than zero");
    }
}
