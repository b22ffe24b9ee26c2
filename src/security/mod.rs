//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Provider call on cache miss:
//!     → rate_limit.rs (per-provider window)
//!     → rejected: gateway serves mock data
//! ```
//!
//! # Design Decisions
//! - Limits are per provider, not per caller
//! - A rejection never increments the counter

pub mod rate_limit;

pub use rate_limit::{RateLimitError, RateLimiter};
