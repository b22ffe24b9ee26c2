//! Per-provider request rate limiting.
//!
//! Each provider gets a counter and a window anchor. Windows are reset
//! lazily on the next check once they have elapsed, so no timer task is
//! needed and a reconfigured window length applies from the next reset.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::config::{ProviderKind, RateLimitConfig, WindowPolicy};
use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rate limit exceeded for {provider}: {count}/{limit}")]
pub struct RateLimitError {
    pub provider: ProviderKind,
    pub count: u32,
    pub limit: u32,
}

/// Counter for one provider.
#[derive(Debug, Default)]
struct Window {
    count: u32,
    /// Start of the current window. `None` until the first accepted call.
    anchor: Option<Instant>,
}

impl Window {
    fn expire(&mut self, now: Instant, length: Duration) {
        if let Some(anchor) = self.anchor {
            if now >= anchor + length {
                self.count = 0;
                self.anchor = None;
            }
        }
    }
}

pub struct RateLimiter {
    windows: DashMap<ProviderKind, Window>,
    policy: WindowPolicy,
    length: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            policy: config.policy,
            length: Duration::from_secs(config.window_secs),
            clock,
        }
    }

    /// Count one call against `kind`, or reject it if the window is full.
    ///
    /// Returns the count after the increment.
    pub fn check_and_increment(&self, kind: ProviderKind, limit: u32) -> Result<u32, RateLimitError> {
        let now = self.clock.now();
        let mut window = self.windows.entry(kind).or_default();
        window.expire(now, self.length);

        if window.count >= limit {
            let err = RateLimitError {
                provider: kind,
                count: window.count,
                limit,
            };
            drop(window);
            tracing::warn!(provider = %kind, count = err.count, limit, "Rate limit exceeded");
            metrics::record_rate_limited(kind.as_str());
            return Err(err);
        }

        window.count += 1;
        match self.policy {
            WindowPolicy::Fixed => {
                window.anchor.get_or_insert(now);
            }
            WindowPolicy::Rolling => window.anchor = Some(now),
        }
        Ok(window.count)
    }

    /// Calls counted in the current window.
    pub fn count(&self, kind: ProviderKind) -> u32 {
        let now = self.clock.now();
        self.windows
            .get_mut(&kind)
            .map(|mut window| {
                window.expire(now, self.length);
                window.count
            })
            .unwrap_or(0)
    }

    pub fn reset(&self, kind: ProviderKind) {
        self.windows.remove(&kind);
    }
}
