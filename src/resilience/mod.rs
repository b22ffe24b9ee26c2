//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Execute(op, fallback, component, operation):
//!     → timeouts.rs (deadline + cancellation token)
//!     → On failure: classifier.rs (typed variant, else message rules)
//!     → coordinator.rs
//!         critical   → alert (does not pick the branch)
//!         retryable  → backoff.rs delay → fallback
//!         degradable → degraded.rs canned payload
//!         otherwise  → errors.rs EnrichedError
//! ```
//!
//! # Design Decisions
//! - Every wrapped operation has a deadline
//! - Exactly one recovery attempt per call; no retry loop at this level
//! - Critical failures are never masked silently: they always alert

pub mod backoff;
pub mod classifier;
pub mod coordinator;
pub mod degraded;
pub mod errors;
pub mod timeouts;

pub use classifier::{Classification, ErrorClass, ErrorClassifier};
pub use coordinator::{Alert, AlertSink, LogAlertSink, Outcome, RecoveryCoordinator};
pub use degraded::DegradedResponse;
pub use errors::{EnrichedError, EnrichedErrorView, OperationError};
pub use timeouts::TimeoutGuard;
