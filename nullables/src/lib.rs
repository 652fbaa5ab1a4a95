//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the engine (the clock and the durable event log)
//! are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod event_log;

pub use clock::NullClock;
pub use event_log::NullEventLog;
