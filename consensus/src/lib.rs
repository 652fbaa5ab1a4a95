//! Reputation-weighted BFT voting for a swarm of autonomous agents.
//!
//! Participants author proposals and vote on them; each ballot is weighted by
//! the voter's reputation (`base + reputation * per_point`). A proposal is
//! approved the moment quorum is met with a weighted approval ratio strictly
//! above the threshold, rejected when quorum is met without it (or every
//! active participant has voted), and expires when its deadline passes
//! undecided. Outcomes feed reputation back into the ledger.
//!
//! # Components
//! - [`ReputationLedger`]: reputation scores and vote weights
//! - [`ParticipantRegistry`]: enrolment, liveness, authoring capacity
//! - [`Proposal`] / [`Tally`]: a proposal and its running weighted sums
//! - [`VoteAggregator`]: ballot validation, weighting, the termination check
//! - [`OutcomeRecorder`]: outcomes, execution reports, reputation deltas
//! - [`ConsensusEngine`]: the lifecycle state machine tying them together
//!
//! Every state change is appended to a [`swarm_store::EventLog`] before it
//! is applied; [`ConsensusEngine::replay`] rebuilds state from that log.

pub mod aggregator;
pub mod decider;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod proposal;
pub mod registry;
mod replay;
pub mod reputation;
mod sync;

pub use aggregator::{StagedVote, Verdict, VoteAggregator};
pub use decider::Decider;
pub use engine::{ConsensusEngine, ParticipantView, SwarmStats, VoteReceipt};
pub use error::ConsensusError;
pub use outcome::{OutcomeRecorder, Resolution, MAX_PERFORMANCE_SCORE};
pub use proposal::{Proposal, Tally, Vote};
pub use registry::{Participant, ParticipantRegistry};
pub use reputation::ReputationLedger;
