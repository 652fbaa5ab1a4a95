//! Participant registry — enrolment, liveness and authoring capacity.
//!
//! Participants are never removed, only deactivated. The active set is capped
//! at `max_participants`; that cap also applies when reactivating.

use crate::error::ConsensusError;
use crate::sync::{lock, read, write};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};
use swarm_types::{AgentKind, ParticipantId, SwarmParams, Timestamp};

/// An enrolled agent. Reputation lives in the [`ReputationLedger`](crate::ReputationLedger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub kind: AgentKind,
    pub name: String,
    /// Inactive participants can neither author proposals nor vote.
    pub active: bool,
    /// Maximum number of Open proposals this participant may author at once.
    pub capacity: u32,
    /// Authored proposals currently Open.
    pub open_proposals: u32,
    pub registered_at: Timestamp,
    pub last_active: Timestamp,
    pub proposals_created: u32,
    pub votes_cast: u32,
    /// Authored proposals that reached Executed.
    pub successful_proposals: u32,
}

impl Participant {
    pub(crate) fn enrolled(
        id: ParticipantId,
        kind: AgentKind,
        name: String,
        capacity: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            active: true,
            capacity,
            open_proposals: 0,
            registered_at: now,
            last_active: now,
            proposals_created: 0,
            votes_cast: 0,
            successful_proposals: 0,
        }
    }

    /// Whether another proposal may be authored right now.
    pub fn has_capacity(&self) -> bool {
        self.open_proposals < self.capacity
    }
}

/// The set of enrolled participants.
///
/// Membership changes (register, deactivate, reactivate) are serialized on
/// their own mutex and persist without holding the participant map, so
/// liveness reads from voters never wait on the event log.
pub struct ParticipantRegistry {
    participants: RwLock<BTreeMap<ParticipantId, Participant>>,
    changes: Mutex<()>,
    max_active: u32,
    default_capacity: u32,
}

impl ParticipantRegistry {
    pub fn new(params: &SwarmParams) -> Self {
        Self {
            participants: RwLock::new(BTreeMap::new()),
            changes: Mutex::new(()),
            max_active: params.max_participants,
            default_capacity: params.max_open_proposals_per_participant,
        }
    }

    /// Enrol a new participant.
    ///
    /// `persist` runs after validation and before the participant becomes
    /// visible; if it fails, nothing changes.
    pub fn register<F>(
        &self,
        id: ParticipantId,
        kind: AgentKind,
        name: String,
        now: Timestamp,
        persist: F,
    ) -> Result<Participant, ConsensusError>
    where
        F: FnOnce(&Participant) -> Result<(), ConsensusError>,
    {
        let _changes = lock(&self.changes);
        {
            let participants = read(&self.participants);
            if participants.contains_key(&id) {
                return Err(ConsensusError::AlreadyRegistered(id));
            }
            if Self::count_active(&participants) >= self.max_active {
                return Err(ConsensusError::RegistryFull {
                    capacity: self.max_active,
                });
            }
        }

        let participant = Participant::enrolled(id.clone(), kind, name, self.default_capacity, now);
        persist(&participant)?;
        write(&self.participants).insert(id, participant.clone());
        Ok(participant)
    }

    /// Mark a participant inactive. Idempotent: returns `Ok(false)` without
    /// calling `persist` when already inactive. Open proposals it authored
    /// are unaffected.
    pub fn deactivate<F>(&self, id: &ParticipantId, persist: F) -> Result<bool, ConsensusError>
    where
        F: FnOnce() -> Result<(), ConsensusError>,
    {
        let _changes = lock(&self.changes);
        if !self.active_flag(id)? {
            return Ok(false);
        }
        persist()?;
        self.set_active(id, false);
        Ok(true)
    }

    /// Mark a participant active again, subject to the active-set cap.
    /// Idempotent like [`deactivate`](Self::deactivate).
    pub fn reactivate<F>(&self, id: &ParticipantId, persist: F) -> Result<bool, ConsensusError>
    where
        F: FnOnce() -> Result<(), ConsensusError>,
    {
        let _changes = lock(&self.changes);
        if self.active_flag(id)? {
            return Ok(false);
        }
        if self.active_count() >= self.max_active {
            return Err(ConsensusError::RegistryFull {
                capacity: self.max_active,
            });
        }
        persist()?;
        self.set_active(id, true);
        Ok(true)
    }

    /// Re-insert a participant read back from the event log, keeping the
    /// capacity it was registered with. No cap checks: the log is
    /// authoritative even if the limits have since been lowered.
    pub(crate) fn restore(&self, participant: Participant) -> Result<(), ConsensusError> {
        let mut participants = write(&self.participants);
        if participants.contains_key(&participant.id) {
            return Err(ConsensusError::AlreadyRegistered(participant.id));
        }
        participants.insert(participant.id.clone(), participant);
        Ok(())
    }

    /// Replay a logged liveness change, again without cap checks.
    pub(crate) fn restore_active(&self, id: &ParticipantId, active: bool) -> Result<(), ConsensusError> {
        write(&self.participants)
            .get_mut(id)
            .map(|p| p.active = active)
            .ok_or_else(|| ConsensusError::UnknownParticipant(id.clone()))
    }

    /// Number of active participants — the denominator for the exhaustive-vote check.
    pub fn active_count(&self) -> u32 {
        Self::count_active(&read(&self.participants))
    }

    /// Number of active participants for which `pred` holds.
    pub fn count_active_where(&self, pred: impl Fn(&ParticipantId) -> bool) -> u32 {
        read(&self.participants)
            .values()
            .filter(|p| p.active && pred(&p.id))
            .count() as u32
    }

    pub fn is_active(&self, id: &ParticipantId) -> bool {
        read(&self.participants)
            .get(id)
            .map(|p| p.active)
            .unwrap_or(false)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<Participant> {
        read(&self.participants).get(id).cloned()
    }

    /// Every participant, ordered by identity.
    pub fn all(&self) -> Vec<Participant> {
        read(&self.participants).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        read(&self.participants).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that `id` may author a proposal now.
    pub fn check_can_propose(&self, id: &ParticipantId) -> Result<(), ConsensusError> {
        let participants = read(&self.participants);
        let participant = participants
            .get(id)
            .filter(|p| p.active)
            .ok_or_else(|| ConsensusError::UnauthorizedProposer(id.clone()))?;
        if !participant.has_capacity() {
            return Err(ConsensusError::ProposerAtCapacity {
                participant: id.clone(),
                open: participant.open_proposals,
                capacity: participant.capacity,
            });
        }
        Ok(())
    }

    pub(crate) fn note_proposal_opened(&self, id: &ParticipantId, now: Timestamp) {
        if let Some(p) = write(&self.participants).get_mut(id) {
            p.open_proposals = p.open_proposals.saturating_add(1);
            p.proposals_created = p.proposals_created.saturating_add(1);
            p.last_active = p.last_active.max(now);
        }
    }

    pub(crate) fn note_proposal_closed(&self, id: &ParticipantId) {
        if let Some(p) = write(&self.participants).get_mut(id) {
            p.open_proposals = p.open_proposals.saturating_sub(1);
        }
    }

    /// Count a ballot. Overwrites of an earlier ballot are not counted again.
    pub(crate) fn note_vote(&self, id: &ParticipantId, now: Timestamp, first_ballot: bool) {
        if let Some(p) = write(&self.participants).get_mut(id) {
            if first_ballot {
                p.votes_cast = p.votes_cast.saturating_add(1);
            }
            p.last_active = p.last_active.max(now);
        }
    }

    pub(crate) fn note_execution_success(&self, id: &ParticipantId) {
        if let Some(p) = write(&self.participants).get_mut(id) {
            p.successful_proposals = p.successful_proposals.saturating_add(1);
        }
    }

    fn active_flag(&self, id: &ParticipantId) -> Result<bool, ConsensusError> {
        read(&self.participants)
            .get(id)
            .map(|p| p.active)
            .ok_or_else(|| ConsensusError::UnknownParticipant(id.clone()))
    }

    fn set_active(&self, id: &ParticipantId, active: bool) {
        if let Some(p) = write(&self.participants).get_mut(id) {
            p.active = active;
        }
    }

    fn count_active(participants: &BTreeMap<ParticipantId, Participant>) -> u32 {
        participants.values().filter(|p| p.active).count() as u32
    }
}
