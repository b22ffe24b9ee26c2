//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (executions, errors, cache, providers, health)
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `gateway_executions_total` (counter): wrapped operations by component, outcome
//! - `gateway_operation_duration_seconds` (histogram): wrapped operation latency
//! - `gateway_errors_total` (counter): failures by component, kind
//! - `gateway_critical_alerts_total` (counter): critical alerts by component
//! - `gateway_cache_lookups_total` (counter): lookups by provider, result
//! - `gateway_rate_limited_total` (counter): rejected provider calls
//! - `gateway_provider_calls_total` (counter): real calls by provider, outcome
//! - `gateway_provider_call_duration_seconds` (histogram): real call latency
//! - `gateway_health_status` (gauge): 0 healthy, 1 degraded, 2 critical
//! - `gateway_memory_usage_mb` (gauge): latest process memory sample
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are low-cardinality: component names, provider names, fixed outcomes

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::OverallStatus;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_execution(component: &str, outcome: &'static str, elapsed: Duration) {
    counter!("gateway_executions_total", "component" => component.to_string(), "outcome" => outcome).increment(1);
    histogram!("gateway_operation_duration_seconds", "component" => component.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_error(component: &str, kind: &'static str) {
    counter!("gateway_errors_total", "component" => component.to_string(), "kind" => kind).increment(1);
}

pub fn record_critical_alert(component: &str) {
    counter!("gateway_critical_alerts_total", "component" => component.to_string()).increment(1);
}

pub fn record_cache_lookup(provider: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("gateway_cache_lookups_total", "provider" => provider, "result" => result).increment(1);
}

pub fn record_rate_limited(provider: &'static str) {
    counter!("gateway_rate_limited_total", "provider" => provider).increment(1);
}

pub fn record_provider_call(provider: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!("gateway_provider_calls_total", "provider" => provider, "outcome" => outcome).increment(1);
    histogram!("gateway_provider_call_duration_seconds", "provider" => provider).record(elapsed.as_secs_f64());
}

pub fn record_health_status(status: OverallStatus, memory_mb: f64) {
    gauge!("gateway_health_status").set(status.as_gauge());
    gauge!("gateway_memory_usage_mb").set(memory_mb);
}
