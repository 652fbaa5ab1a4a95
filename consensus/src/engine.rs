//! Consensus engine — orchestrates the proposal lifecycle.
//!
//! Every proposal lives in its own `Mutex` slot, so operations on different
//! proposals run in parallel while operations on one proposal are
//! linearised. Each mutating operation appends its events to the log before
//! changing in-memory state; a failed append leaves everything as it was.

use crate::aggregator::VoteAggregator;
use crate::error::{check_len, ConsensusError};
use crate::outcome::{OutcomeRecorder, Resolution};
use crate::proposal::{Proposal, Tally};
use crate::registry::{Participant, ParticipantRegistry};
use crate::reputation::ReputationLedger;
use crate::sync::{lock, read, write};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use swarm_store::{EventLog, SwarmEvent};
use swarm_types::{
    AgentKind, Clock, ExecutionReport, Outcome, ParticipantId, ProposalId, ProposalKind,
    ProposalStatus, SwarmParams, Timestamp, VoteChoice,
};
use tracing::{debug, info, warn};

pub(crate) type ProposalSlots = BTreeMap<ProposalId, Arc<Mutex<Proposal>>>;

/// Result of an accepted vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub proposal_id: ProposalId,
    /// Tally right after this vote.
    pub tally: Tally,
    /// Status right after this vote.
    pub status: ProposalStatus,
    /// The vote replaced an earlier ballot from the same voter.
    pub overwrite: bool,
    /// Set when this vote terminated the proposal.
    pub outcome: Option<Outcome>,
}

/// A participant together with its current reputation and vote weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    pub reputation: u16,
    pub vote_weight: u64,
}

/// Aggregate counters for dashboards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SwarmStats {
    pub registered_participants: usize,
    pub active_participants: u32,
    pub total_proposals: usize,
    pub open_proposals: usize,
    pub approved_proposals: usize,
    pub rejected_proposals: usize,
    pub expired_proposals: usize,
    pub executed_proposals: usize,
}

/// The reputation-weighted voting engine.
pub struct ConsensusEngine {
    pub(crate) params: SwarmParams,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) log: Arc<dyn EventLog>,
    pub(crate) registry: Arc<ParticipantRegistry>,
    pub(crate) ledger: Arc<ReputationLedger>,
    pub(crate) aggregator: VoteAggregator,
    pub(crate) recorder: OutcomeRecorder,
    pub(crate) proposals: RwLock<ProposalSlots>,
    /// Next id to allocate. Held for the whole of a creation, so ids reach
    /// the log gapless and in order; the slot table itself is only
    /// write-locked for the insert.
    pub(crate) next_id: Mutex<ProposalId>,
}

impl ConsensusEngine {
    /// Create an empty engine. Fails if `params` do not validate.
    pub fn new(
        params: SwarmParams,
        clock: Arc<dyn Clock>,
        log: Arc<dyn EventLog>,
    ) -> Result<Self, ConsensusError> {
        params.validate()?;
        let registry = Arc::new(ParticipantRegistry::new(&params));
        let ledger = Arc::new(ReputationLedger::new(&params));
        let aggregator = VoteAggregator::new(&params, registry.clone(), ledger.clone());
        let recorder = OutcomeRecorder::new(&params, ledger.clone(), log.clone());
        Ok(Self {
            params,
            clock,
            log,
            registry,
            ledger,
            aggregator,
            recorder,
            proposals: RwLock::new(BTreeMap::new()),
            next_id: Mutex::new(ProposalId::FIRST),
        })
    }

    // ── Participants ────────────────────────────────────────────────────

    /// Enrol a participant at the initial reputation.
    pub fn register_participant(
        &self,
        id: ParticipantId,
        kind: AgentKind,
        name: impl Into<String>,
    ) -> Result<Participant, ConsensusError> {
        let name = name.into();
        check_len("name", name.as_bytes(), self.params.max_name_len)?;
        let now = self.clock.now();

        let participant = self.registry.register(id, kind, name, now, |p| {
            self.log.append(&[SwarmEvent::ParticipantRegistered {
                participant: p.id.clone(),
                kind: p.kind,
                name: p.name.clone(),
                capacity: p.capacity,
                at: now,
            }])?;
            self.ledger.enroll(&p.id);
            Ok(())
        })?;

        info!(
            participant = %participant.id,
            kind = participant.kind.name(),
            active = self.registry.active_count(),
            "participant registered"
        );
        Ok(participant)
    }

    /// Deactivate a participant. Its open proposals carry on. Returns
    /// whether anything changed.
    pub fn deactivate_participant(&self, id: &ParticipantId) -> Result<bool, ConsensusError> {
        let now = self.clock.now();
        let changed = self.registry.deactivate(id, || {
            self.log.append(&[SwarmEvent::ParticipantDeactivated {
                participant: id.clone(),
                at: now,
            }])?;
            Ok(())
        })?;
        if changed {
            info!(participant = %id, "participant deactivated");
        }
        Ok(changed)
    }

    /// Reactivate a participant, subject to the active-set cap.
    pub fn reactivate_participant(&self, id: &ParticipantId) -> Result<bool, ConsensusError> {
        let now = self.clock.now();
        let changed = self.registry.reactivate(id, || {
            self.log.append(&[SwarmEvent::ParticipantReactivated {
                participant: id.clone(),
                at: now,
            }])?;
            Ok(())
        })?;
        if changed {
            info!(participant = %id, "participant reactivated");
        }
        Ok(changed)
    }

    // ── Proposals ───────────────────────────────────────────────────────

    /// Open a proposal with a voting window of `voting_window_secs`.
    pub fn create_proposal(
        &self,
        proposer: &ParticipantId,
        kind: ProposalKind,
        payload: Vec<u8>,
        description: impl Into<String>,
    ) -> Result<ProposalId, ConsensusError> {
        let description = description.into();
        check_len("payload", &payload, self.params.max_payload_len)?;
        check_len("description", description.as_bytes(), self.params.max_description_len)?;
        if self.registry.active_count() == 0 {
            return Err(ConsensusError::NoQuorumPossible);
        }

        let mut next_id = lock(&self.next_id);
        self.registry.check_can_propose(proposer)?;

        let id = *next_id;
        let now = self.clock.now();
        let deadline = now.plus_secs(self.params.voting_window_secs);
        self.log.append(&[SwarmEvent::ProposalCreated {
            id,
            proposer: proposer.clone(),
            kind,
            payload: payload.clone(),
            description: description.clone(),
            created_at: now,
            deadline,
        }])?;

        let proposal = Proposal::new(id, proposer.clone(), kind, payload, description, now, deadline);
        write(&self.proposals).insert(id, Arc::new(Mutex::new(proposal)));
        *next_id = id.next();
        self.registry.note_proposal_opened(proposer, now);

        info!(proposal = %id, %proposer, ?kind, %deadline, "proposal opened");
        Ok(id)
    }

    /// Record a vote and resolve the proposal if the vote decides it.
    ///
    /// A later vote from the same participant replaces the earlier one. A
    /// vote arriving after the deadline expires the proposal and fails with
    /// `ProposalClosed`.
    pub fn submit_vote(
        &self,
        proposal_id: ProposalId,
        voter: &ParticipantId,
        choice: VoteChoice,
        reasoning: impl Into<String>,
    ) -> Result<VoteReceipt, ConsensusError> {
        let slot = self.slot(proposal_id)?;
        let mut proposal = lock(&slot);
        let now = self.clock.now();

        if proposal.is_overdue(now) {
            self.resolve(&mut proposal, ProposalStatus::Expired, now, Vec::new())?;
            return Err(ConsensusError::ProposalClosed {
                id: proposal_id,
                status: ProposalStatus::Expired,
            });
        }

        let staged = self
            .aggregator
            .stage(&proposal, voter, choice, reasoning.into(), now)
            .map_err(|e| {
                if matches!(e, ConsensusError::UnauthorizedVoter(_)) {
                    warn!(proposal = %proposal_id, %voter, "vote from unauthorized participant");
                }
                e
            })?;
        let verdict = self
            .aggregator
            .evaluate(staged.tally(), |id| staged.will_have_voted(&proposal, id))?;

        let event = SwarmEvent::VoteCast {
            proposal: proposal_id,
            voter: voter.clone(),
            choice,
            reasoning: staged.vote().reasoning.clone(),
            cast_at: now,
        };
        let overwrite = staged.is_overwrite();

        // Work on a copy so a failed resolution leaves the slot untouched.
        let mut next = proposal.clone();
        staged.apply(&mut next);
        let outcome = match verdict.status() {
            None => {
                self.log.append(&[event])?;
                None
            }
            Some(status) => Some(self.resolve(&mut next, status, now, vec![event])?),
        };
        *proposal = next;
        self.registry.note_vote(voter, now, !overwrite);

        debug!(
            proposal = %proposal_id,
            %voter,
            ?choice,
            overwrite,
            for_weight = proposal.tally().for_weight,
            against_weight = proposal.tally().against_weight,
            participation = proposal.tally().participation,
            ?verdict,
            "vote recorded"
        );

        Ok(VoteReceipt {
            proposal_id,
            tally: proposal.tally().clone(),
            status: proposal.status(),
            overwrite,
            outcome,
        })
    }

    /// Execution-layer acknowledgement for an approved proposal.
    ///
    /// Success moves it to Executed; failure keeps it Approved and sets the
    /// `execution_failed` audit flag. Returns the resulting status.
    pub fn on_execution_result(
        &self,
        proposal_id: ProposalId,
        success: bool,
        metrics: Vec<u8>,
    ) -> Result<ProposalStatus, ConsensusError> {
        let slot = self.slot(proposal_id)?;
        let mut proposal = lock(&slot);
        proposal.check_transition(ProposalStatus::Executed)?;

        let now = self.clock.now();
        let report = ExecutionReport {
            proposal_id,
            success,
            metrics,
            reported_at: now,
        };
        self.recorder.record_execution(report, &proposal.proposer)?;

        if success {
            proposal.set_status(ProposalStatus::Executed, now)?;
            self.registry.note_execution_success(&proposal.proposer);
            info!(proposal = %proposal_id, proposer = %proposal.proposer, "proposal executed");
        } else {
            proposal.execution_failed = true;
            warn!(proposal = %proposal_id, "execution failed; proposal stays approved");
        }
        Ok(proposal.status())
    }

    /// Expire every Open proposal past its deadline. Returns the expired ids.
    pub fn expire_overdue(&self) -> Result<Vec<ProposalId>, ConsensusError> {
        let now = self.clock.now();
        let mut expired = Vec::new();
        for (id, slot) in self.snapshot() {
            let mut proposal = lock(&slot);
            if proposal.is_overdue(now) {
                self.resolve(&mut proposal, ProposalStatus::Expired, now, Vec::new())?;
                expired.push(id);
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expired overdue proposals");
        }
        Ok(expired)
    }

    /// Feed an external performance score in `[0, 1000]` into reputation.
    pub fn apply_performance_score(
        &self,
        participant: &ParticipantId,
        score: u16,
    ) -> Result<u16, ConsensusError> {
        self.recorder.apply_performance_score(participant, score)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// A proposal as of now; an overdue proposal is expired first.
    pub fn get_proposal(&self, id: ProposalId) -> Result<Proposal, ConsensusError> {
        let slot = self.slot(id)?;
        let mut proposal = lock(&slot);
        let now = self.clock.now();
        if proposal.is_overdue(now) {
            self.resolve(&mut proposal, ProposalStatus::Expired, now, Vec::new())?;
        }
        Ok(proposal.clone())
    }

    /// Open proposals in id order, after expiring overdue ones.
    pub fn list_open_proposals(&self) -> Result<Vec<Proposal>, ConsensusError> {
        self.expire_overdue()?;
        Ok(self
            .snapshot()
            .into_iter()
            .map(|(_, slot)| lock(&slot).clone())
            .filter(|p| p.status().is_open())
            .collect())
    }

    /// Every proposal in id order, as currently recorded.
    pub fn list_proposals(&self) -> Vec<Proposal> {
        self.snapshot()
            .into_iter()
            .map(|(_, slot)| lock(&slot).clone())
            .collect()
    }

    pub fn get_participant(&self, id: &ParticipantId) -> Option<ParticipantView> {
        self.view_of(self.registry.get(id)?)
    }

    /// Participants by reputation, descending; ties broken by identity.
    pub fn get_leaderboard(&self, limit: usize) -> Vec<ParticipantView> {
        self.ledger
            .ranking(limit)
            .into_iter()
            .filter_map(|(id, _)| self.get_participant(&id))
            .collect()
    }

    pub fn get_outcome(&self, id: ProposalId) -> Option<Outcome> {
        self.recorder.outcome(id)
    }

    pub fn execution_reports(&self, id: ProposalId) -> Vec<ExecutionReport> {
        self.recorder.executions(id)
    }

    pub fn stats(&self) -> SwarmStats {
        let mut stats = SwarmStats {
            registered_participants: self.registry.len(),
            active_participants: self.registry.active_count(),
            ..SwarmStats::default()
        };
        for proposal in self.list_proposals() {
            stats.total_proposals += 1;
            match proposal.status() {
                ProposalStatus::Open => stats.open_proposals += 1,
                ProposalStatus::Approved => stats.approved_proposals += 1,
                ProposalStatus::Rejected => stats.rejected_proposals += 1,
                ProposalStatus::Expired => stats.expired_proposals += 1,
                ProposalStatus::Executed => stats.executed_proposals += 1,
            }
        }
        stats
    }

    pub fn params(&self) -> &SwarmParams {
        &self.params
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ReputationLedger {
        &self.ledger
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Internals ───────────────────────────────────────────────────────

    pub(crate) fn slot(&self, id: ProposalId) -> Result<Arc<Mutex<Proposal>>, ConsensusError> {
        read(&self.proposals)
            .get(&id)
            .cloned()
            .ok_or(ConsensusError::ProposalNotFound(id))
    }

    fn snapshot(&self) -> Vec<(ProposalId, Arc<Mutex<Proposal>>)> {
        read(&self.proposals)
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect()
    }

    fn view_of(&self, participant: Participant) -> Option<ParticipantView> {
        let reputation = self.ledger.get(&participant.id)?;
        let vote_weight = self.ledger.weight_for(reputation).ok()?;
        Some(ParticipantView {
            participant,
            reputation,
            vote_weight,
        })
    }

    /// Move an Open proposal into a terminal status through the recorder.
    /// The caller holds the proposal's slot lock.
    fn resolve(
        &self,
        proposal: &mut Proposal,
        status: ProposalStatus,
        now: Timestamp,
        preceding: Vec<SwarmEvent>,
    ) -> Result<Outcome, ConsensusError> {
        proposal.check_transition(status)?;
        let tally = proposal.tally();
        let resolution = Resolution {
            proposer: proposal.proposer.clone(),
            outcome: Outcome {
                proposal_id: proposal.id,
                final_status: status,
                for_weight: tally.for_weight,
                against_weight: tally.against_weight,
                participation_count: tally.participation,
                resolved_at: now,
            },
            ballots: proposal.votes().map(|v| (v.voter.clone(), v.choice)).collect(),
        };
        let outcome = self.recorder.finalize(resolution, preceding)?;
        proposal.set_status(status, now)?;
        self.registry.note_proposal_closed(&proposal.proposer);
        Ok(outcome)
    }
}
