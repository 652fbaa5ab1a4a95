//! LMDB storage backend for the agent swarm.
//!
//! Implements [`swarm_store::EventLog`] using the `heed` LMDB bindings. Events
//! are bincode-encoded and keyed by a big-endian `u64` sequence number, so a
//! cursor walk returns them in append order.

pub mod error;
pub mod event_log;

pub use error::LmdbError;
pub use event_log::LmdbEventLog;
