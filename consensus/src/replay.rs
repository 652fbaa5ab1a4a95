//! Rebuilding engine state from the event log.
//!
//! Replay applies each recorded event directly to the in-memory components,
//! bypassing the public operations so nothing is appended again. Events are
//! applied in sequence order; the ledger therefore holds the same scores at
//! each ballot as it did when the ballot was cast.
//!
//! The log is authoritative. Admission rules that were checked when an event
//! was written (registry caps, voter liveness, payload limits) are not
//! checked again, so a log stays replayable after the limits are changed or
//! when a liveness change raced a ballot.

use crate::engine::ConsensusEngine;
use crate::error::ConsensusError;
use crate::proposal::Proposal;
use crate::registry::Participant;
use crate::sync::{lock, write};
use std::sync::{Arc, Mutex};
use swarm_store::{EventLog, StoreError, SwarmEvent};
use swarm_types::{Clock, ProposalStatus, SwarmParams};
use tracing::{info, warn};

impl ConsensusEngine {
    /// Build an engine from every event in `log`. Later operations on the
    /// returned engine append to the same log.
    pub fn replay(
        params: SwarmParams,
        clock: Arc<dyn Clock>,
        log: Arc<dyn EventLog>,
    ) -> Result<Self, ConsensusError> {
        let engine = Self::new(params, clock, log.clone())?;
        let events = log.read_all()?;
        let count = events.len();
        for sequenced in events {
            engine
                .apply_event(sequenced.event)
                .map_err(|e| ConsensusError::Replay {
                    sequence: sequenced.sequence,
                    reason: e.to_string(),
                })?;
        }
        info!(
            events = count,
            participants = engine.registry.len(),
            proposals = engine.list_proposals().len(),
            "engine state replayed"
        );
        Ok(engine)
    }

    fn apply_event(&self, event: SwarmEvent) -> Result<(), ConsensusError> {
        match event {
            SwarmEvent::ParticipantRegistered {
                participant,
                kind,
                name,
                capacity,
                at,
            } => {
                self.registry.restore(Participant::enrolled(
                    participant.clone(),
                    kind,
                    name,
                    capacity,
                    at,
                ))?;
                self.ledger.enroll(&participant);
            }
            SwarmEvent::ParticipantDeactivated { participant, .. } => {
                self.registry.restore_active(&participant, false)?;
            }
            SwarmEvent::ParticipantReactivated { participant, .. } => {
                self.registry.restore_active(&participant, true)?;
            }
            SwarmEvent::ProposalCreated {
                id,
                proposer,
                kind,
                payload,
                description,
                created_at,
                deadline,
            } => {
                let mut next_id = lock(&self.next_id);
                let mut slots = write(&self.proposals);
                if slots.contains_key(&id) {
                    return Err(StoreError::Corruption(format!("proposal {id} created twice")).into());
                }
                let proposal = Proposal::new(
                    id,
                    proposer.clone(),
                    kind,
                    payload,
                    description,
                    created_at,
                    deadline,
                );
                slots.insert(id, Arc::new(Mutex::new(proposal)));
                *next_id = (*next_id).max(id.next());
                self.registry.note_proposal_opened(&proposer, created_at);
            }
            SwarmEvent::VoteCast {
                proposal,
                voter,
                choice,
                reasoning,
                cast_at,
            } => {
                let slot = self.slot(proposal)?;
                let mut proposal = lock(&slot);
                if !proposal.status().is_open() {
                    return Err(StoreError::Corruption(format!(
                        "vote on proposal {} after it closed",
                        proposal.id()
                    ))
                    .into());
                }
                let staged = self
                    .aggregator
                    .weigh(&proposal, &voter, choice, reasoning, cast_at)?;
                let first_ballot = !staged.is_overwrite();
                staged.apply(&mut proposal);
                self.registry.note_vote(&voter, cast_at, first_ballot);
            }
            SwarmEvent::ProposalResolved { outcome } => {
                let slot = self.slot(outcome.proposal_id)?;
                let mut proposal = lock(&slot);
                if proposal.tally().for_weight != outcome.for_weight
                    || proposal.tally().against_weight != outcome.against_weight
                {
                    warn!(
                        proposal = %outcome.proposal_id,
                        recorded_for = outcome.for_weight,
                        replayed_for = proposal.tally().for_weight,
                        "replayed tally differs from recorded outcome"
                    );
                }
                proposal.set_status(outcome.final_status, outcome.resolved_at)?;
                self.registry.note_proposal_closed(&proposal.proposer);
                self.recorder.restore_outcome(outcome);
            }
            SwarmEvent::ReputationAdjusted {
                participant, delta, ..
            } => {
                self.recorder.restore_adjustment(&participant, delta);
            }
            SwarmEvent::ExecutionReported { report } => {
                let slot = self.slot(report.proposal_id)?;
                let mut proposal = lock(&slot);
                if report.success {
                    proposal.set_status(ProposalStatus::Executed, report.reported_at)?;
                    self.registry.note_execution_success(&proposal.proposer);
                } else {
                    proposal.check_transition(ProposalStatus::Executed)?;
                    proposal.execution_failed = true;
                }
                self.recorder.restore_execution(report);
            }
        }
        Ok(())
    }
}
