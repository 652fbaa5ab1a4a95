//! Fundamental types for the agent swarm consensus engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! participant and proposal identifiers, the closed proposal/vote/status enums,
//! timestamps and the clock seam, outcome records, and the engine parameters.

pub mod error;
pub mod outcome;
pub mod params;
pub mod participant;
pub mod proposal;
pub mod time;

pub use error::ParamsError;
pub use outcome::{ExecutionReport, Outcome};
pub use params::SwarmParams;
pub use participant::{AgentKind, ParticipantId};
pub use proposal::{ProposalId, ProposalKind, ProposalStatus, VoteChoice};
pub use time::{Clock, SystemClock, Timestamp};
