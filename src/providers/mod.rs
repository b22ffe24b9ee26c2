//! External API providers.
//!
//! # Data Flow
//! ```text
//! gateway.rs (cache, rate limit, mock fallback)
//!     → client.rs ProviderApi::call
//!         → HttpTransport (bearer auth, timeout, retry)
//!     → or ProviderApi::mock (analytics.rs, search_console.rs, competitive.rs, lead_scoring.rs)
//! ```
//!
//! # Design Decisions
//! - One gateway per provider; all gateways share one cache and one limiter
//! - Mock data is deterministic so the system is fully usable offline

pub mod analytics;
pub mod client;
pub mod competitive;
pub mod gateway;
pub mod lead_scoring;
pub mod search_console;
pub mod types;

pub use analytics::{AnalyticsApi, AnalyticsQuery};
pub use client::{HttpTransport, ProviderApi, ProviderError, ProviderResult};
pub use competitive::{CompetitiveApi, CompetitorQuery};
pub use gateway::{ApiHealth, ApiHealthStatus, DataSource, Fetched, GatewayControl, MockReason, ProviderGateway};
pub use lead_scoring::LeadScoringApi;
pub use search_console::{SearchConsoleApi, SiteQuery};
