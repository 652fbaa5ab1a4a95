//! Append-only event log abstraction for the agent swarm.
//!
//! Every state-mutating engine operation is recorded as a batch of
//! [`SwarmEvent`]s. Replaying the log in order reconstructs the engine state;
//! it is the only durability path. Backends (LMDB, in-memory for testing)
//! implement [`EventLog`] and the rest of the codebase depends only on the trait.

pub mod error;
pub mod event;
pub mod event_log;

pub use error::StoreError;
pub use event::{ReputationReason, SwarmEvent};
pub use event_log::{EventLog, SequencedEvent};
