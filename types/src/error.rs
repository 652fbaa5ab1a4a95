use thiserror::Error;

/// Rejected engine parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("max_participants must be within {min}..={max}, got {got}")]
    MaxParticipants { min: u32, max: u32, got: u32 },

    #[error("min_votes_required must be within 1..={max_participants}, got {got}")]
    MinVotes { max_participants: u32, got: u32 },

    #[error("approval_threshold_bps must be within 1..10000, got {0}")]
    ApprovalThreshold(u32),

    #[error("voting_window_secs must be within {min}..={max}, got {got}")]
    VotingWindow { min: u64, max: u64, got: u64 },

    #[error("max_open_proposals_per_participant must be at least 1")]
    ProposerCapacity,

    #[error("initial_reputation {initial} exceeds max_reputation {max}")]
    InitialReputation { initial: u16, max: u16 },
}
