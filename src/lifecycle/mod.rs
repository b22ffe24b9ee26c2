//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → monitor loop exits, admin server drains, watcher stops
//!     → final health report logged by main
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
