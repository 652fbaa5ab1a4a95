//! Immutable records produced when a proposal resolves or is executed.

use crate::{ProposalId, ProposalStatus, Timestamp};
use serde::{Deserialize, Serialize};

/// The decision recorded when a proposal leaves `Open`.
///
/// `final_status` is always one of `Approved`, `Rejected` or `Expired`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub proposal_id: ProposalId,
    pub final_status: ProposalStatus,
    pub for_weight: u64,
    pub against_weight: u64,
    pub participation_count: u32,
    pub resolved_at: Timestamp,
}

/// What the execution layer reported back for an approved proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub proposal_id: ProposalId,
    pub success: bool,
    /// Opaque execution metrics, kept for audit.
    pub metrics: Vec<u8>,
    pub reported_at: Timestamp,
}
