//! Reputation ledger — the single owner of every participant's reputation.
//!
//! Reputation is an integer in `[0, max_reputation]`. Vote weight is derived
//! from it on demand (`base + reputation * per_point`) and never cached on a
//! ballot; tallies instead remember the ledger [`revision`] their weights came
//! from and reweigh when it has moved.
//!
//! [`revision`]: ReputationLedger::revision

use crate::error::ConsensusError;
use crate::sync::{read, write};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use swarm_types::{ParticipantId, SwarmParams};

/// Reputation scores keyed by participant.
pub struct ReputationLedger {
    scores: RwLock<HashMap<ParticipantId, u16>>,
    /// Bumped on every adjustment that changed a score.
    revision: AtomicU64,
    initial: u16,
    max: u16,
    base_weight: u64,
    weight_per_point: u64,
}

impl ReputationLedger {
    pub fn new(params: &SwarmParams) -> Self {
        Self {
            scores: RwLock::new(HashMap::new()),
            revision: AtomicU64::new(0),
            initial: params.initial_reputation,
            max: params.max_reputation,
            base_weight: params.base_vote_weight,
            weight_per_point: params.weight_per_reputation_point,
        }
    }

    /// Start tracking a participant at the initial reputation. No-op if already tracked.
    pub(crate) fn enroll(&self, participant: &ParticipantId) {
        write(&self.scores)
            .entry(participant.clone())
            .or_insert(self.initial);
    }

    /// Current reputation, or `None` for an unknown participant.
    pub fn get(&self, participant: &ParticipantId) -> Option<u16> {
        read(&self.scores).get(participant).copied()
    }

    /// Add `delta` to a participant's reputation, clamped into `[0, max]`.
    ///
    /// Never fails: unknown participants are ignored (returns `None`),
    /// out-of-range results saturate at the bounds. Concurrent adjustments are
    /// serialized by the ledger's write lock.
    pub fn adjust(&self, participant: &ParticipantId, delta: i32) -> Option<u16> {
        let mut scores = write(&self.scores);
        let score = scores.get_mut(participant)?;
        let next = (i64::from(*score) + i64::from(delta)).clamp(0, i64::from(self.max)) as u16;
        if next != *score {
            *score = next;
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
        Some(next)
    }

    /// Vote weight for the participant's current reputation.
    pub fn weight_of(&self, participant: &ParticipantId) -> Result<u64, ConsensusError> {
        let reputation = self
            .get(participant)
            .ok_or_else(|| ConsensusError::UnknownParticipant(participant.clone()))?;
        self.weight_for(reputation)
    }

    /// Vote weight for a given reputation: `base + reputation * per_point`.
    pub fn weight_for(&self, reputation: u16) -> Result<u64, ConsensusError> {
        u64::from(reputation)
            .checked_mul(self.weight_per_point)
            .and_then(|bonus| bonus.checked_add(self.base_weight))
            .ok_or(ConsensusError::ArithmeticOverflow("vote weight"))
    }

    /// Upper bound of any single participant's weight.
    pub fn max_weight(&self) -> Result<u64, ConsensusError> {
        self.weight_for(self.max)
    }

    /// Counter identifying the current set of scores.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Participants ordered by reputation descending, ties broken by identity.
    pub fn ranking(&self, limit: usize) -> Vec<(ParticipantId, u16)> {
        let mut ranked: Vec<(ParticipantId, u16)> = read(&self.scores)
            .iter()
            .map(|(id, score)| (id.clone(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Number of tracked participants.
    pub fn len(&self) -> usize {
        read(&self.scores).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
