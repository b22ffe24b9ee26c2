//! Recovery coordinator: fault-tolerant execution of a single operation.
//!
//! # State machine (per call)
//! ```text
//! Running → Succeeded
//! Running → Failed → Recovered(fallback)   retryable: backoff, then fallback
//!                  → Recovered(degraded)   degradable: canned payload
//!                  → Unrecovered           otherwise, or the fallback failed
//! ```
//! Critical failures raise an alert on the way through; the alert does not
//! change which branch is taken.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ResilienceConfig;
use crate::health::HealthMonitor;
use crate::observability::metrics;
use crate::resilience::backoff::recovery_delay;
use crate::resilience::classifier::{Classification, ErrorClassifier};
use crate::resilience::degraded::DegradedResponse;
use crate::resilience::errors::{EnrichedError, OperationError};
use crate::resilience::timeouts::TimeoutGuard;

/// Successful result of `execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation itself succeeded.
    Succeeded(T),
    /// The operation failed transiently and the fallback succeeded.
    Recovered(T),
    /// A canned payload stands in for the result.
    Degraded(DegradedResponse),
}

impl<T> Outcome<T> {
    /// The real or fallback value, `None` in degraded mode.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Succeeded(value) | Outcome::Recovered(value) => Some(value),
            Outcome::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Succeeded(_) => "succeeded",
            Outcome::Recovered(_) => "recovered",
            Outcome::Degraded(_) => "degraded",
        }
    }
}

impl<T: Serialize> Outcome<T> {
    /// JSON body for renderers; degraded payloads carry `"fallback": true`.
    pub fn into_json(self) -> serde_json::Result<serde_json::Value> {
        match self {
            Outcome::Succeeded(value) | Outcome::Recovered(value) => serde_json::to_value(value),
            Outcome::Degraded(payload) => serde_json::to_value(payload),
        }
    }
}

/// Structured alert raised for critical failures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub severity: &'static str,
    pub component: String,
    pub operation: String,
    pub error: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub incident_id: Uuid,
}

/// Destination for critical alerts.
pub trait AlertSink: Send + Sync {
    fn send(&self, alert: &Alert);
}

/// Emits alerts as structured `error` events on the `alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn send(&self, alert: &Alert) {
        tracing::error!(
            target: "alert",
            severity = alert.severity,
            component = %alert.component,
            operation = %alert.operation,
            message = %alert.error,
            timestamp = %alert.timestamp,
            incident_id = %alert.incident_id,
            "Critical error alert"
        );
    }
}

pub struct RecoveryCoordinator {
    guard: TimeoutGuard,
    classifier: ErrorClassifier,
    monitor: Arc<HealthMonitor>,
    clock: Arc<dyn Clock>,
    alerts: Arc<dyn AlertSink>,
    backoff: Duration,
}

impl RecoveryCoordinator {
    pub fn new(
        config: &ResilienceConfig,
        monitor: Arc<HealthMonitor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            guard: TimeoutGuard::new(config.operation_timeout()),
            classifier: ErrorClassifier::new(&config.rules)?,
            monitor,
            clock,
            alerts: Arc::new(LogAlertSink),
            backoff: recovery_delay(config.recovery_attempt, config.backoff_base_ms, config.backoff_max_ms),
        })
    }

    /// Replace the alert destination.
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Run `op` under the deadline and recover from its failure where possible.
    ///
    /// `op` receives a token that is cancelled if the deadline elapses.
    /// `fallback` runs only for retryable failures, after the backoff step.
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
        let _in_flight = self.monitor.track_connection();
        let started = self.clock.now();

        let error = match self.guard.run(op).await {
            Ok(value) => {
                let elapsed = self.clock.now().saturating_duration_since(started);
                self.monitor.record_success(component, elapsed);
                metrics::record_execution(component, "succeeded", elapsed);
                return Ok(Outcome::Succeeded(value));
            }
            Err(error) => error,
        };

        let incident_id = Uuid::new_v4();
        let class = self.classifier.inspect(&error);
        self.record_failure(&error, class, component, operation, incident_id);

        match self.attempt_recovery(&error, class, fallback, component).await {
            Some(outcome) => {
                self.monitor.record_recovery();
                let elapsed = self.clock.now().saturating_duration_since(started);
                metrics::record_execution(component, outcome.label(), elapsed);
                Ok(outcome)
            }
            None => {
                let elapsed = self.clock.now().saturating_duration_since(started);
                metrics::record_execution(component, "unrecovered", elapsed);
                Err(EnrichedError {
                    component: component.to_string(),
                    operation: operation.to_string(),
                    source: error,
                    timestamp: self.clock.timestamp(),
                    incident_id,
                })
            }
        }
    }

    fn record_failure(
        &self,
        error: &OperationError,
        class: Classification,
        component: &str,
        operation: &str,
        incident_id: Uuid,
    ) {
        let message = error.to_string();
        self.monitor.record_error(component, error.kind(), &message);
        metrics::record_error(component, error.kind());

        tracing::error!(
            component,
            operation,
            error = %message,
            kind = error.kind(),
            strategy = ?class.strategy(),
            incident_id = %incident_id,
            "Operation failed"
        );

        if class.critical {
            self.monitor.record_critical();
            metrics::record_critical_alert(component);
            self.alerts.send(&Alert {
                severity: "critical",
                component: component.to_string(),
                operation: operation.to_string(),
                error: message,
                timestamp: self.clock.timestamp(),
                incident_id,
            });
        }
    }

    async fn attempt_recovery<T, FB, FbFut>(
        &self,
        error: &OperationError,
        class: Classification,
        fallback: FB,
        component: &str,
    ) -> Option<Outcome<T>>
    where
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, OperationError>>,
    {
        if class.retryable {
            self.clock.sleep(self.backoff).await;
            return match fallback().await {
                Ok(value) => {
                    tracing::info!(component, "Recovery successful using fallback");
                    Some(Outcome::Recovered(value))
                }
                Err(fallback_error) => {
                    tracing::error!(
                        component,
                        original = %error,
                        error = %fallback_error,
                        "Recovery failed"
                    );
                    None
                }
            };
        }

        if class.degradable {
            tracing::warn!(component, "Running in degraded mode");
            return Some(Outcome::Degraded(DegradedResponse::for_component(
                component,
                self.clock.timestamp(),
            )));
        }

        None
    }
}
