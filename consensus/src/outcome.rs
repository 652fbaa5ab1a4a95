//! Outcome recording and the reputation feedback loop.
//!
//! The recorder is the only component that writes reputation. Each call
//! persists its event batch and then applies the matching ledger
//! adjustments while holding the recorder's writer lock, so concurrent
//! finalisations are atomic with respect to each other. Recorded outcomes
//! sit behind a separate lock that is never held across log I/O.

use crate::error::{check_len, ConsensusError};
use crate::reputation::ReputationLedger;
use crate::sync::lock;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use swarm_store::{EventLog, ReputationReason, SwarmEvent};
use swarm_types::{
    ExecutionReport, Outcome, ParticipantId, ProposalId, ProposalStatus, SwarmParams, VoteChoice,
};
use tracing::{debug, info};

/// Highest accepted performance score.
pub const MAX_PERFORMANCE_SCORE: u16 = 1_000;
const NEUTRAL_PERFORMANCE_SCORE: i32 = 500;

/// Everything the recorder needs to finalise one proposal.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub proposer: ParticipantId,
    pub outcome: Outcome,
    /// Final ballots, one per voter.
    pub ballots: Vec<(ParticipantId, VoteChoice)>,
}

#[derive(Default)]
struct RecorderState {
    outcomes: HashMap<ProposalId, Outcome>,
    executions: BTreeMap<ProposalId, Vec<ExecutionReport>>,
}

/// Persists outcomes and execution reports and applies reputation deltas.
pub struct OutcomeRecorder {
    ledger: Arc<ReputationLedger>,
    log: Arc<dyn EventLog>,
    writer: Mutex<()>,
    state: Mutex<RecorderState>,
    executed_bonus: i32,
    rejected_penalty: i32,
    majority_bonus: i32,
    max_metrics_len: usize,
}

impl OutcomeRecorder {
    pub fn new(params: &SwarmParams, ledger: Arc<ReputationLedger>, log: Arc<dyn EventLog>) -> Self {
        Self {
            ledger,
            log,
            writer: Mutex::new(()),
            state: Mutex::new(RecorderState::default()),
            executed_bonus: params.proposer_executed_bonus,
            rejected_penalty: params.proposer_rejected_penalty,
            majority_bonus: params.majority_voter_bonus,
            max_metrics_len: params.max_metrics_len,
        }
    }

    /// Record a proposal's outcome and apply its reputation deltas.
    ///
    /// `preceding` events (the vote that triggered resolution) are written in
    /// the same batch. Idempotent per proposal: a repeat call returns the
    /// stored outcome and writes nothing.
    pub fn finalize(
        &self,
        resolution: Resolution,
        preceding: Vec<SwarmEvent>,
    ) -> Result<Outcome, ConsensusError> {
        let _writer = lock(&self.writer);
        let id = resolution.outcome.proposal_id;
        if let Some(existing) = lock(&self.state).outcomes.get(&id) {
            debug!(proposal = %id, "finalize repeated, returning recorded outcome");
            return Ok(existing.clone());
        }

        let adjustments = self.deltas_for(&resolution);
        let mut batch = preceding;
        batch.push(SwarmEvent::ProposalResolved {
            outcome: resolution.outcome.clone(),
        });
        batch.extend(adjustments.iter().map(|(participant, delta, reason)| {
            SwarmEvent::ReputationAdjusted {
                participant: participant.clone(),
                delta: *delta,
                reason: *reason,
            }
        }));
        self.log.append(&batch)?;

        for (participant, delta, _) in &adjustments {
            self.ledger.adjust(participant, *delta);
        }
        lock(&self.state)
            .outcomes
            .insert(id, resolution.outcome.clone());

        info!(
            proposal = %id,
            status = %resolution.outcome.final_status,
            for_weight = resolution.outcome.for_weight,
            against_weight = resolution.outcome.against_weight,
            participation = resolution.outcome.participation_count,
            adjustments = adjustments.len(),
            "proposal resolved"
        );
        Ok(resolution.outcome)
    }

    /// Record an execution report; on success credit the proposer.
    ///
    /// The caller guarantees the proposal is Approved, which makes the
    /// success credit happen at most once.
    pub fn record_execution(
        &self,
        report: ExecutionReport,
        proposer: &ParticipantId,
    ) -> Result<(), ConsensusError> {
        check_len("metrics", &report.metrics, self.max_metrics_len)?;
        let _writer = lock(&self.writer);

        let mut batch = vec![SwarmEvent::ExecutionReported {
            report: report.clone(),
        }];
        if report.success {
            batch.push(SwarmEvent::ReputationAdjusted {
                participant: proposer.clone(),
                delta: self.executed_bonus,
                reason: ReputationReason::ProposalExecuted(report.proposal_id),
            });
        }
        self.log.append(&batch)?;

        if report.success {
            self.ledger.adjust(proposer, self.executed_bonus);
        }
        lock(&self.state)
            .executions
            .entry(report.proposal_id)
            .or_default()
            .push(report);
        Ok(())
    }

    /// Adjust reputation by an external performance score in `[0, 1000]`.
    /// The delta is `(score - 500) / 10`. Returns the new reputation.
    pub fn apply_performance_score(
        &self,
        participant: &ParticipantId,
        score: u16,
    ) -> Result<u16, ConsensusError> {
        if score > MAX_PERFORMANCE_SCORE {
            return Err(ConsensusError::InvalidPerformanceScore(score));
        }
        let _writer = lock(&self.writer);
        if self.ledger.get(participant).is_none() {
            return Err(ConsensusError::UnknownParticipant(participant.clone()));
        }

        let delta = (i32::from(score) - NEUTRAL_PERFORMANCE_SCORE) / 10;
        self.log.append(&[SwarmEvent::ReputationAdjusted {
            participant: participant.clone(),
            delta,
            reason: ReputationReason::PerformanceScore(score),
        }])?;
        let reputation = self
            .ledger
            .adjust(participant, delta)
            .ok_or_else(|| ConsensusError::UnknownParticipant(participant.clone()))?;
        info!(%participant, score, delta, reputation, "performance score applied");
        Ok(reputation)
    }

    pub fn outcome(&self, id: ProposalId) -> Option<Outcome> {
        lock(&self.state).outcomes.get(&id).cloned()
    }

    /// Execution reports for a proposal, oldest first.
    pub fn executions(&self, id: ProposalId) -> Vec<ExecutionReport> {
        lock(&self.state)
            .executions
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn outcome_count(&self) -> usize {
        lock(&self.state).outcomes.len()
    }

    pub(crate) fn restore_outcome(&self, outcome: Outcome) {
        lock(&self.state).outcomes.insert(outcome.proposal_id, outcome);
    }

    pub(crate) fn restore_execution(&self, report: ExecutionReport) {
        lock(&self.state)
            .executions
            .entry(report.proposal_id)
            .or_default()
            .push(report);
    }

    pub(crate) fn restore_adjustment(&self, participant: &ParticipantId, delta: i32) {
        self.ledger.adjust(participant, delta);
    }

    fn deltas_for(&self, resolution: &Resolution) -> Vec<(ParticipantId, i32, ReputationReason)> {
        let id = resolution.outcome.proposal_id;
        let (majority, mut deltas) = match resolution.outcome.final_status {
            ProposalStatus::Approved => (VoteChoice::Approve, Vec::new()),
            ProposalStatus::Rejected => (
                VoteChoice::Reject,
                vec![(
                    resolution.proposer.clone(),
                    self.rejected_penalty,
                    ReputationReason::ProposalRejected(id),
                )],
            ),
            _ => return Vec::new(),
        };
        if self.majority_bonus != 0 {
            deltas.extend(
                resolution
                    .ballots
                    .iter()
                    .filter(|(_, choice)| *choice == majority)
                    .map(|(voter, _)| {
                        (voter.clone(), self.majority_bonus, ReputationReason::MajorityVote(id))
                    }),
            );
        }
        deltas
    }
}
