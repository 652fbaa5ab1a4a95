//! Vote aggregation — ballot validation, weighting and the termination check.
//!
//! Recording a vote is split in two: [`VoteAggregator::stage`] does every
//! fallible step against an immutable proposal and produces a [`StagedVote`];
//! [`StagedVote::apply`] then commits it and cannot fail. A rejected vote
//! therefore never leaves a partial tally behind.

use crate::error::{check_len, ConsensusError};
use crate::proposal::{Proposal, Tally, Vote};
use crate::registry::ParticipantRegistry;
use crate::reputation::ReputationLedger;
use std::sync::Arc;
use swarm_types::{ParticipantId, ProposalStatus, SwarmParams, Timestamp, VoteChoice};

/// What the tally says after a vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Not decided yet; keep collecting votes.
    Pending,
    Approve,
    Reject,
}

impl Verdict {
    /// The terminal status this verdict moves a proposal into.
    pub fn status(&self) -> Option<ProposalStatus> {
        match self {
            Self::Pending => None,
            Self::Approve => Some(ProposalStatus::Approved),
            Self::Reject => Some(ProposalStatus::Rejected),
        }
    }
}

/// A validated, weighted ballot not yet applied to its proposal.
#[derive(Clone, Debug)]
pub struct StagedVote {
    vote: Vote,
    tally: Tally,
    /// New counted weights for existing ballots, when the tally was reweighed.
    reweighed: Vec<(ParticipantId, u64)>,
    overwrite: bool,
}

impl StagedVote {
    pub fn vote(&self) -> &Vote {
        &self.vote
    }

    /// The tally as it will be once applied.
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Whether this replaces an earlier ballot from the same voter.
    pub fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    /// Whether `participant` will have a ballot on `proposal` once applied.
    pub fn will_have_voted(&self, proposal: &Proposal, participant: &ParticipantId) -> bool {
        *participant == self.vote.voter || proposal.has_voted(participant)
    }

    /// Every `(voter, choice)` pair as it will be once applied.
    pub fn ballots(&self, proposal: &Proposal) -> Vec<(ParticipantId, VoteChoice)> {
        let mut ballots: Vec<(ParticipantId, VoteChoice)> = proposal
            .votes()
            .filter(|v| v.voter != self.vote.voter)
            .map(|v| (v.voter.clone(), v.choice))
            .collect();
        ballots.push((self.vote.voter.clone(), self.vote.choice));
        ballots
    }

    /// Commit the ballot. Must be applied to the proposal it was staged against.
    pub fn apply(self, proposal: &mut Proposal) {
        for (voter, weight) in self.reweighed {
            if let Some(vote) = proposal.votes.get_mut(&voter) {
                vote.counted_weight = weight;
            }
        }
        proposal.votes.insert(self.vote.voter.clone(), self.vote);
        proposal.tally = self.tally;
    }
}

/// Applies reputation weighting to ballots and evaluates quorum and approval.
pub struct VoteAggregator {
    registry: Arc<ParticipantRegistry>,
    ledger: Arc<ReputationLedger>,
    min_votes: u32,
    threshold_bps: u32,
    max_reasoning_len: usize,
}

impl VoteAggregator {
    pub fn new(
        params: &SwarmParams,
        registry: Arc<ParticipantRegistry>,
        ledger: Arc<ReputationLedger>,
    ) -> Self {
        Self {
            registry,
            ledger,
            min_votes: params.min_votes_required,
            threshold_bps: params.approval_threshold_bps,
            max_reasoning_len: params.max_reasoning_len,
        }
    }

    /// Validate and weigh a ballot without touching the proposal.
    ///
    /// Checks, in order: reasoning length, that the proposal is Open and not
    /// past its deadline, that the voter is registered and active. Weights
    /// come from the ledger as it is now; if the ledger moved since the
    /// tally was last computed every ballot is reweighed, otherwise only the
    /// voter's previous ballot (if any) is swapped out.
    pub fn stage(
        &self,
        proposal: &Proposal,
        voter: &ParticipantId,
        choice: VoteChoice,
        reasoning: String,
        now: Timestamp,
    ) -> Result<StagedVote, ConsensusError> {
        check_len("reasoning", reasoning.as_bytes(), self.max_reasoning_len)?;

        let status = proposal.effective_status(now);
        if !status.is_open() {
            return Err(ConsensusError::ProposalClosed {
                id: proposal.id(),
                status,
            });
        }
        if !self.registry.is_active(voter) {
            return Err(ConsensusError::UnauthorizedVoter(voter.clone()));
        }
        self.weigh(proposal, voter, choice, reasoning, now)
    }

    /// Weigh a ballot that is already known to be admissible, such as one
    /// read back from the event log. Skips the policy checks of
    /// [`stage`](Self::stage): whether the voter was active is settled by
    /// the log, not by the registry as it stands now.
    pub(crate) fn weigh(
        &self,
        proposal: &Proposal,
        voter: &ParticipantId,
        choice: VoteChoice,
        reasoning: String,
        now: Timestamp,
    ) -> Result<StagedVote, ConsensusError> {
        // Read the revision first: an adjustment racing the weight reads
        // leaves the tally marked stale, never fresh.
        let revision = self.ledger.revision();
        let weight = self.ledger.weight_of(voter)?;
        let previous = proposal.vote_of(voter);

        let mut reweighed = Vec::new();
        let mut tally = if proposal.tally().ledger_revision != revision && !proposal.votes.is_empty() {
            let mut fresh = Tally::default();
            for ballot in proposal.votes().filter(|v| v.voter != *voter) {
                let w = self.ledger.weight_of(&ballot.voter)?;
                fresh.add(ballot.choice, w)?;
                reweighed.push((ballot.voter.clone(), w));
            }
            fresh
        } else {
            let mut running = proposal.tally().clone();
            if let Some(old) = previous {
                running.remove(old.choice, old.counted_weight)?;
            }
            running
        };
        tally.add(choice, weight)?;
        tally.ledger_revision = revision;

        Ok(StagedVote {
            vote: Vote {
                voter: voter.clone(),
                choice,
                reasoning,
                cast_at: now,
                counted_weight: weight,
            },
            tally,
            reweighed,
            overwrite: previous.is_some(),
        })
    }

    /// Stage and apply in one step, returning the new tally.
    pub fn record_vote(
        &self,
        proposal: &mut Proposal,
        voter: &ParticipantId,
        choice: VoteChoice,
        reasoning: String,
        now: Timestamp,
    ) -> Result<Tally, ConsensusError> {
        let staged = self.stage(proposal, voter, choice, reasoning, now)?;
        let tally = staged.tally().clone();
        staged.apply(proposal);
        Ok(tally)
    }

    /// Decide whether `tally` terminates its proposal.
    ///
    /// Once quorum is met the weighted ratio decides. Below quorum, the
    /// proposal is rejected as soon as every active participant has voted.
    pub fn evaluate(
        &self,
        tally: &Tally,
        has_voted: impl Fn(&ParticipantId) -> bool,
    ) -> Result<Verdict, ConsensusError> {
        if tally.participation >= self.min_votes {
            return Ok(if tally.exceeds_threshold(self.threshold_bps)? {
                Verdict::Approve
            } else {
                Verdict::Reject
            });
        }
        let active = self.registry.active_count();
        if active > 0 && self.registry.count_active_where(has_voted) >= active {
            return Ok(Verdict::Reject);
        }
        Ok(Verdict::Pending)
    }

    /// Evaluate a proposal's current tally.
    pub fn evaluate_proposal(&self, proposal: &Proposal) -> Result<Verdict, ConsensusError> {
        self.evaluate(proposal.tally(), |id| proposal.has_voted(id))
    }
}
