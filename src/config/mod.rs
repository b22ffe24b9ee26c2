//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated)
//!     → ResiliencePlatform::new
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → provider sections applied via UpdateProviderConfig
//! ```
//!
//! # Design Decisions
//! - Only provider settings are hot-reloadable; everything else needs a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_or_default, ConfigError, ConfigResult};
pub use watcher::ConfigWatcher;
pub use schema::{
    AdminConfig, CacheConfig, ClassificationRules, FeaturesConfig, GatewayConfig, LogFormat, MonitoringConfig,
    ObservabilityConfig, ProviderConfig, ProviderConfigPatch, ProviderKind, ProvidersConfig,
    RateLimitConfig, ResilienceConfig, WindowPolicy,
};
