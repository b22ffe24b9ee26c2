//! Error taxonomy for wrapped operations.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by an operation run through the recovery coordinator.
///
/// Call sites that know the nature of a failure pick the matching variant.
/// `Opaque` is for errors from libraries that do not say; those are
/// classified by message pattern.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    /// The deadline elapsed before the operation settled.
    #[error("Operation timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Transient condition; the fallback is worth trying.
    #[error("{0}")]
    Retryable(String),

    /// A non-critical dependency is unavailable; a canned response is acceptable.
    #[error("{0}")]
    Degradable(String),

    /// Integrity, security or fatal condition; always alerted, never masked.
    #[error("{0}")]
    Critical(String),

    /// Unclassified failure from an opaque source.
    #[error("{0}")]
    Opaque(String),
}

impl OperationError {
    /// Wrap any displayable error as an opaque failure.
    pub fn opaque(err: impl fmt::Display) -> Self {
        OperationError::Opaque(err.to_string())
    }

    /// Stable label used as the by-kind metrics key.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationError::Timeout(_) => "timeout",
            OperationError::Retryable(_) => "retryable",
            OperationError::Degradable(_) => "degradable",
            OperationError::Critical(_) => "critical",
            OperationError::Opaque(_) => "opaque",
        }
    }
}

/// An unrecovered failure with the context it happened in.
#[derive(Debug, Clone, Error)]
#[error("[{component}.{operation}] {source}")]
pub struct EnrichedError {
    pub component: String,
    pub operation: String,
    pub source: OperationError,
    pub timestamp: DateTime<Utc>,
    /// Shared with the alert, when one was raised.
    pub incident_id: Uuid,
}

impl EnrichedError {
    /// JSON view for callers that render the failure.
    pub fn to_view(&self) -> EnrichedErrorView {
        EnrichedErrorView {
            message: self.to_string(),
            original_error: self.source.to_string(),
            kind: self.source.kind(),
            component: self.component.clone(),
            operation: self.operation.clone(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            incident_id: self.incident_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedErrorView {
    pub message: String,
    pub original_error: String,
    pub kind: &'static str,
    pub component: String,
    pub operation: String,
    pub timestamp: String,
    pub incident_id: Uuid,
}
