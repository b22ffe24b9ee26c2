//! Health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Outcome bookkeeping (monitor.rs):
//!     RecoveryCoordinator reports success / error / recovery / critical
//!     → ErrorMetrics + bounded response-time window
//!     → per-component state.rs transitions
//!
//! Monitoring tick (monitor.rs, every interval):
//!     memory.rs sample → bounded memory window
//!     → component error-rate decay
//!     → state.rs status evaluation
//! ```
//!
//! # Design Decisions
//! - Overall status is derived from current averages, not accumulated
//! - Windows are bounded so memory use is constant
//! - Counters are approximate under concurrency; they are bookkeeping, not
//!   inputs to correctness decisions

pub mod memory;
pub mod monitor;
pub mod state;
pub mod window;

pub use memory::{FixedMemorySampler, MemorySampler, ProcessMemorySampler};
pub use monitor::{ErrorMetrics, HealthMonitor, HealthReport, ReportMetrics};
pub use state::{ComponentHealth, ComponentStatus, OverallStatus};
