use swarm_store::StoreError;
use swarm_types::{ParamsError, ParticipantId, ProposalId, ProposalStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("participant {0} is already registered")]
    AlreadyRegistered(ParticipantId),

    #[error("registry is full: {capacity} active participants")]
    RegistryFull { capacity: u32 },

    #[error("participant {0} is not registered")]
    UnknownParticipant(ParticipantId),

    #[error("participant {0} is not an active registered voter")]
    UnauthorizedVoter(ParticipantId),

    #[error("participant {0} is not an active registered proposer")]
    UnauthorizedProposer(ParticipantId),

    #[error("participant {participant} already has {open} open proposals (capacity {capacity})")]
    ProposerAtCapacity {
        participant: ParticipantId,
        open: u32,
        capacity: u32,
    },

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {id} is closed ({status})")]
    ProposalClosed {
        id: ProposalId,
        status: ProposalStatus,
    },

    #[error("no active participants: quorum is impossible")]
    NoQuorumPossible,

    #[error("proposal {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: ProposalId,
        from: ProposalStatus,
        to: ProposalStatus,
    },

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("{field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("performance score {0} is outside 0..=1000")]
    InvalidPerformanceScore(u16),

    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("replay failed at event {sequence}: {reason}")]
    Replay { sequence: u64, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Reject `value` when it is longer than `max` bytes.
pub(crate) fn check_len(field: &'static str, value: &[u8], max: usize) -> Result<(), ConsensusError> {
    if value.len() > max {
        return Err(ConsensusError::FieldTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}
