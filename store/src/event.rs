//! Events recorded in the log, one variant per state-mutating operation.

use serde::{Deserialize, Serialize};
use swarm_types::{
    AgentKind, ExecutionReport, Outcome, ParticipantId, ProposalId, ProposalKind, Timestamp,
    VoteChoice,
};

/// Why a participant's reputation moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReputationReason {
    /// Proposer of a proposal that was executed successfully.
    ProposalExecuted(ProposalId),
    /// Proposer of a rejected proposal.
    ProposalRejected(ProposalId),
    /// Voted with the outcome of a resolved proposal.
    MajorityVote(ProposalId),
    /// External performance score in `[0, 1000]`.
    PerformanceScore(u16),
}

/// One durable state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SwarmEvent {
    ParticipantRegistered {
        participant: ParticipantId,
        kind: AgentKind,
        name: String,
        capacity: u32,
        at: Timestamp,
    },
    ParticipantDeactivated {
        participant: ParticipantId,
        at: Timestamp,
    },
    ParticipantReactivated {
        participant: ParticipantId,
        at: Timestamp,
    },
    ProposalCreated {
        id: ProposalId,
        proposer: ParticipantId,
        kind: ProposalKind,
        payload: Vec<u8>,
        description: String,
        created_at: Timestamp,
        deadline: Timestamp,
    },
    VoteCast {
        proposal: ProposalId,
        voter: ParticipantId,
        choice: VoteChoice,
        reasoning: String,
        cast_at: Timestamp,
    },
    ProposalResolved {
        outcome: Outcome,
    },
    ReputationAdjusted {
        participant: ParticipantId,
        /// Requested delta, before clamping.
        delta: i32,
        reason: ReputationReason,
    },
    ExecutionReported {
        report: ExecutionReport,
    },
}

impl SwarmEvent {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ParticipantRegistered { .. } => "participant_registered",
            Self::ParticipantDeactivated { .. } => "participant_deactivated",
            Self::ParticipantReactivated { .. } => "participant_reactivated",
            Self::ProposalCreated { .. } => "proposal_created",
            Self::VoteCast { .. } => "vote_cast",
            Self::ProposalResolved { .. } => "proposal_resolved",
            Self::ReputationAdjusted { .. } => "reputation_adjusted",
            Self::ExecutionReported { .. } => "execution_reported",
        }
    }
}
