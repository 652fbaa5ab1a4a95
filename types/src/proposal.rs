//! Proposal identifiers and the closed enums of the voting model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing proposal identifier. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(u64);

impl ProposalId {
    pub const FIRST: Self = Self(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id allocated after this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a proposal asks the swarm to do. The payload itself stays opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    /// Rebalance portfolio allocation.
    Rebalance,
    /// Execute a specific trade.
    Trade,
    /// Update risk parameters.
    RiskLimit,
    /// Emergency action.
    Emergency,
    /// Change strategy.
    Strategy,
    Custom,
}

/// Lifecycle status of a proposal.
///
/// `Open -> {Approved, Rejected, Expired}`, `Approved -> Executed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Accepting votes.
    Open,
    /// Quorum met with a weighted approval ratio above the threshold.
    Approved,
    /// Quorum met without enough approval, or every active participant voted.
    Rejected,
    /// Deadline passed with no decision. Not punitive.
    Expired,
    /// Approved and acknowledged as executed by the execution layer.
    Executed,
}

impl ProposalStatus {
    /// Whether the proposal still accepts votes.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether `self -> next` is one of the permitted edges.
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Approved)
                | (Self::Open, Self::Rejected)
                | (Self::Open, Self::Expired)
                | (Self::Approved, Self::Executed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Executed => "executed",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ballot choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    Approve,
    Reject,
    /// Counts toward participation, never toward either weight bucket.
    Abstain,
}
