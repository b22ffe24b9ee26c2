//! Time source and delay scheduling.
//!
//! # Responsibilities
//! - Supply the monotonic "now" used by cache TTLs and rate-limit windows
//! - Supply wall-clock timestamps for alerts and enriched errors
//! - Perform delays (recovery backoff, provider retries)
//!
//! # Design Decisions
//! - Injected as `Arc<dyn Clock>`; nothing reads time ambiently
//! - `TokioClock` goes through `tokio::time`, so tests can pause and advance it
//! - `ManualClock` never waits: sleeping advances its virtual time instantly

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use tokio::time::Instant;

/// Source of time for every time-windowed component.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Monotonic instant used for TTL and window arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock timestamp used in reports and error metadata.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Wait for `duration` to elapse on this clock.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Deterministic clock driven by the caller.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move virtual time forward.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().expect("manual clock mutex poisoned");
        *elapsed += by;
    }

    /// Total virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("manual clock mutex poisoned")
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or_default();
        self.wall_origin + elapsed
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}
