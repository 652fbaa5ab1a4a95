//! The seam to the agent layer.
//!
//! Each participant runs its own decision logic and calls
//! [`ConsensusEngine::submit_vote`](crate::ConsensusEngine::submit_vote) with
//! the result. The engine never invokes a decider itself.

use crate::proposal::Proposal;
use swarm_types::VoteChoice;

/// Decides how a participant votes on a proposal.
pub trait Decider: Send + Sync {
    /// Returns the ballot choice and a rationale kept for audit.
    fn decide(&self, proposal: &Proposal) -> (VoteChoice, String);
}

impl<F> Decider for F
where
    F: Fn(&Proposal) -> (VoteChoice, String) + Send + Sync,
{
    fn decide(&self, proposal: &Proposal) -> (VoteChoice, String) {
        self(proposal)
    }
}
