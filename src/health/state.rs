//! Health state and status evaluation.
//!
//! # States
//! - Overall: Healthy, Degraded, Critical
//! - Per component: Healthy, Degraded, Error
//!
//! # State Transitions
//! ```text
//! Overall status is recomputed from current averages, never stored as history:
//!     any critical threshold exceeded → Critical
//!     else any degraded threshold exceeded → Degraded
//!     else → Healthy
//!
//! Component:
//!     success → Healthy, error rate −decay (floor 0)
//!     failure → Error,   error rate +bump (ceiling 1)
//!     tick    → error rate −decay (floor 0)
//! ```

use serde::Serialize;

use crate::config::MonitoringConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Critical,
}

impl OverallStatus {
    /// Gauge encoding: 0 healthy, 1 degraded, 2 critical.
    pub fn as_gauge(&self) -> f64 {
        match self {
            OverallStatus::Healthy => 0.0,
            OverallStatus::Degraded => 1.0,
            OverallStatus::Critical => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Error,
}

/// Last observed health of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    /// Last observed response time in milliseconds.
    pub response_time: f64,
    pub error_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Default for ComponentHealth {
    fn default() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            response_time: 0.0,
            error_rate: 0.0,
            last_error: None,
        }
    }
}

impl ComponentHealth {
    pub fn mark_success(&mut self, response_time_ms: f64, decay: f64) {
        self.status = ComponentStatus::Healthy;
        self.response_time = response_time_ms;
        self.error_rate = (self.error_rate - decay).max(0.0);
        self.last_error = None;
    }

    pub fn mark_error(&mut self, message: &str, bump: f64) {
        self.status = ComponentStatus::Error;
        self.error_rate = (self.error_rate + bump).min(1.0);
        self.last_error = Some(message.to_string());
    }

    pub fn decay(&mut self, decay: f64) {
        self.error_rate = (self.error_rate - decay).max(0.0);
    }
}

/// Pure status function over the current averages.
pub fn evaluate_status(
    avg_response_ms: f64,
    error_rate: f64,
    memory_mb: f64,
    thresholds: &MonitoringConfig,
) -> OverallStatus {
    if avg_response_ms > thresholds.critical_response_ms
        || error_rate > thresholds.critical_error_rate
        || memory_mb > thresholds.critical_memory_mb
    {
        OverallStatus::Critical
    } else if avg_response_ms > thresholds.degraded_response_ms
        || error_rate > thresholds.degraded_error_rate
        || memory_mb > thresholds.degraded_memory_mb
    {
        OverallStatus::Degraded
    } else {
        OverallStatus::Healthy
    }
}
