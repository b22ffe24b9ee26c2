//! Resilience and integration layer for a business-intelligence platform.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller ──▶ RecoveryCoordinator ──▶ TimeoutGuard ──▶ operation
//!                   │    │                                  │
//!                   │    └── ErrorClassifier ◀── failure ───┘
//!                   │              │
//!                   │              ├─ retryable ─▶ backoff ─▶ fallback
//!                   │              ├─ degradable ─▶ DegradedResponse
//!                   │              └─ critical ──▶ AlertSink
//!                   ▼
//!              HealthMonitor (errors, latency, memory, status)
//!
//!   IntelligenceAggregator ──▶ ProviderGateway ×4
//!                                  ├─ ResponseCache (TTL)
//!                                  ├─ RateLimiter (per-provider window)
//!                                  └─ HttpTransport ─▶ external API
//! ```
//!
//! Everything is owned by one [`ResiliencePlatform`]; the [`clock::Clock`]
//! it is built with drives every timestamp, TTL and window.

pub mod admin;
pub mod cache;
pub mod clock;
pub mod config;
pub mod health;
pub mod intelligence;
pub mod lifecycle;
pub mod observability;
pub mod platform;
pub mod providers;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use lifecycle::Shutdown;
pub use platform::{Feature, PlatformError, ResiliencePlatform};
