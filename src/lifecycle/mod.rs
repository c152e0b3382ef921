//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build route table → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel request tokens → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: route collisions and bad config are fatal at startup
//! - Shutdown has a grace period: forced exit after deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
