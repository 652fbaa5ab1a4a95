//! Proposal record, its ballots and the running weighted tally.
//!
//! Fields are crate-private: the engine owns status transitions and the
//! aggregator owns the ballot map, everyone else reads through getters.

use crate::error::ConsensusError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use swarm_types::{ParticipantId, ProposalId, ProposalKind, ProposalStatus, Timestamp, VoteChoice};

const BPS_DENOMINATOR: u64 = 10_000;

/// One participant's ballot on one proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: ParticipantId,
    pub choice: VoteChoice,
    /// Audit only; never used in computation.
    pub reasoning: String,
    pub cast_at: Timestamp,
    /// Weight this ballot currently contributes to the tally.
    pub(crate) counted_weight: u64,
}

impl Vote {
    pub fn counted_weight(&self) -> u64 {
        self.counted_weight
    }
}

/// Weighted running sums over a proposal's ballots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub for_weight: u64,
    pub against_weight: u64,
    /// Distinct voters, abstentions included.
    pub participation: u32,
    pub approvals: u32,
    pub rejections: u32,
    pub abstentions: u32,
    /// Ledger revision the weights were read at.
    pub(crate) ledger_revision: u64,
}

impl Tally {
    pub(crate) fn add(&mut self, choice: VoteChoice, weight: u64) -> Result<(), ConsensusError> {
        match choice {
            VoteChoice::Approve => {
                self.for_weight = self
                    .for_weight
                    .checked_add(weight)
                    .ok_or(ConsensusError::ArithmeticOverflow("for weight"))?;
                self.approvals = self.approvals.saturating_add(1);
            }
            VoteChoice::Reject => {
                self.against_weight = self
                    .against_weight
                    .checked_add(weight)
                    .ok_or(ConsensusError::ArithmeticOverflow("against weight"))?;
                self.rejections = self.rejections.saturating_add(1);
            }
            VoteChoice::Abstain => self.abstentions = self.abstentions.saturating_add(1),
        }
        self.participation = self.participation.saturating_add(1);
        Ok(())
    }

    pub(crate) fn remove(&mut self, choice: VoteChoice, weight: u64) -> Result<(), ConsensusError> {
        let underflow = ConsensusError::ArithmeticOverflow("tally underflow");
        match choice {
            VoteChoice::Approve => {
                self.for_weight = self.for_weight.checked_sub(weight).ok_or(underflow)?;
                self.approvals = self.approvals.saturating_sub(1);
            }
            VoteChoice::Reject => {
                self.against_weight = self.against_weight.checked_sub(weight).ok_or(underflow)?;
                self.rejections = self.rejections.saturating_sub(1);
            }
            VoteChoice::Abstain => self.abstentions = self.abstentions.saturating_sub(1),
        }
        self.participation = self.participation.saturating_sub(1);
        Ok(())
    }

    /// `for_weight + against_weight`.
    pub fn decisive_weight(&self) -> Result<u64, ConsensusError> {
        self.for_weight
            .checked_add(self.against_weight)
            .ok_or(ConsensusError::ArithmeticOverflow("decisive weight"))
    }

    /// Whether `for / (for + against)` is strictly above `threshold_bps / 10_000`.
    ///
    /// With no decisive weight the ratio is 0, so this is `false`.
    pub fn exceeds_threshold(&self, threshold_bps: u32) -> Result<bool, ConsensusError> {
        let total = self.decisive_weight()?;
        if total == 0 {
            return Ok(false);
        }
        let lhs = u128::from(self.for_weight) * u128::from(BPS_DENOMINATOR);
        let rhs = u128::from(threshold_bps)
            .checked_mul(u128::from(total))
            .ok_or(ConsensusError::ArithmeticOverflow("approval ratio"))?;
        Ok(lhs > rhs)
    }

    /// Approval ratio in basis points, rounded down. `None` with no decisive weight.
    pub fn approval_bps(&self) -> Option<u64> {
        let total = self.decisive_weight().ok()?;
        if total == 0 {
            return None;
        }
        let bps = u128::from(self.for_weight) * u128::from(BPS_DENOMINATOR) / u128::from(total);
        u64::try_from(bps).ok()
    }
}

/// A proposed action plus its voting state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub(crate) id: ProposalId,
    pub(crate) proposer: ParticipantId,
    pub(crate) kind: ProposalKind,
    pub(crate) payload: Vec<u8>,
    pub(crate) description: String,
    pub(crate) status: ProposalStatus,
    pub(crate) created_at: Timestamp,
    pub(crate) deadline: Timestamp,
    pub(crate) votes: BTreeMap<ParticipantId, Vote>,
    pub(crate) tally: Tally,
    pub(crate) resolved_at: Option<Timestamp>,
    pub(crate) executed_at: Option<Timestamp>,
    /// Set when the execution layer reported a failure. Audit only.
    pub(crate) execution_failed: bool,
}

impl Proposal {
    pub(crate) fn new(
        id: ProposalId,
        proposer: ParticipantId,
        kind: ProposalKind,
        payload: Vec<u8>,
        description: String,
        created_at: Timestamp,
        deadline: Timestamp,
    ) -> Self {
        Self {
            id,
            proposer,
            kind,
            payload,
            description,
            status: ProposalStatus::Open,
            created_at,
            deadline,
            votes: BTreeMap::new(),
            tally: Tally::default(),
            resolved_at: None,
            executed_at: None,
            execution_failed: false,
        }
    }

    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn proposer(&self) -> &ParticipantId {
        &self.proposer
    }

    pub fn kind(&self) -> ProposalKind {
        self.kind
    }

    /// Opaque action description; never inspected by the engine.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn resolved_at(&self) -> Option<Timestamp> {
        self.resolved_at
    }

    pub fn executed_at(&self) -> Option<Timestamp> {
        self.executed_at
    }

    pub fn execution_failed(&self) -> bool {
        self.execution_failed
    }

    /// Ballots ordered by voter.
    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn vote_of(&self, voter: &ParticipantId) -> Option<&Vote> {
        self.votes.get(voter)
    }

    pub fn has_voted(&self, voter: &ParticipantId) -> bool {
        self.votes.contains_key(voter)
    }

    /// Still `Open` but past its deadline.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.status.is_open() && self.deadline.is_passed(now)
    }

    /// Status as of `now`, counting an overdue proposal as expired.
    pub fn effective_status(&self, now: Timestamp) -> ProposalStatus {
        if self.is_overdue(now) {
            ProposalStatus::Expired
        } else {
            self.status
        }
    }

    pub(crate) fn check_transition(&self, next: ProposalStatus) -> Result<(), ConsensusError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(ConsensusError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            })
        }
    }

    pub(crate) fn set_status(&mut self, next: ProposalStatus, now: Timestamp) -> Result<(), ConsensusError> {
        self.check_transition(next)?;
        if self.status.is_open() {
            self.resolved_at = Some(now);
        }
        if next == ProposalStatus::Executed {
            self.executed_at = Some(now);
        }
        self.status = next;
        Ok(())
    }
}
