//! Engine parameters — quorum, threshold, timing, reputation and payload limits.
//!
//! Every field has a production default; a TOML `[params]` table only needs to
//! name the values it overrides.

use crate::ParamsError;
use serde::{Deserialize, Serialize};

/// Smallest swarm the engine accepts.
pub const MIN_PARTICIPANTS: u32 = 3;
/// Largest swarm the engine accepts.
pub const MAX_PARTICIPANTS: u32 = 20;

pub const MIN_VOTING_WINDOW_SECS: u64 = 300;
pub const MAX_VOTING_WINDOW_SECS: u64 = 86_400;

/// Denominator for every `_bps` value.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// All tunables of the consensus engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmParams {
    // ── Registry ─────────────────────────────────────────────────────────
    /// Maximum number of simultaneously active participants.
    pub max_participants: u32,

    /// How many Open proposals a single participant may author at once.
    pub max_open_proposals_per_participant: u32,

    // ── Voting ───────────────────────────────────────────────────────────
    /// Absolute quorum: distinct ballots needed before a proposal can resolve.
    pub min_votes_required: u32,

    /// Weighted approval ratio a proposal must strictly exceed (basis points).
    pub approval_threshold_bps: u32,

    /// Seconds between creation and deadline.
    pub voting_window_secs: u64,

    // ── Reputation ───────────────────────────────────────────────────────
    pub initial_reputation: u16,

    pub max_reputation: u16,

    /// Weight of a participant with zero reputation.
    pub base_vote_weight: u64,

    /// Extra weight per reputation point.
    pub weight_per_reputation_point: u64,

    /// Credited to the proposer once an approved proposal executes.
    pub proposer_executed_bonus: i32,

    /// Applied to the proposer of a rejected proposal.
    pub proposer_rejected_penalty: i32,

    /// Credited to every voter who sided with the outcome.
    pub majority_voter_bonus: i32,

    // ── Limits ───────────────────────────────────────────────────────────
    pub max_name_len: usize,
    pub max_description_len: usize,
    pub max_reasoning_len: usize,
    pub max_payload_len: usize,
    pub max_metrics_len: usize,
}

impl SwarmParams {
    /// Production configuration: 10 agents, 3 votes, >60% weighted approval, 2 hour windows.
    pub fn production_defaults() -> Self {
        Self {
            max_participants: 10,
            max_open_proposals_per_participant: 3,

            min_votes_required: 3,
            approval_threshold_bps: 6000, // 60%
            voting_window_secs: 2 * 3600,

            initial_reputation: 1_000,
            max_reputation: 10_000,
            base_vote_weight: 1_000,
            weight_per_reputation_point: 10,
            proposer_executed_bonus: 50,
            proposer_rejected_penalty: -30,
            majority_voter_bonus: 5,

            max_name_len: 32,
            max_description_len: 256,
            max_reasoning_len: 512,
            max_payload_len: 1024,
            max_metrics_len: 512,
        }
    }

    /// Local development: same rules, 5 minute voting windows.
    pub fn dev_defaults() -> Self {
        Self {
            voting_window_secs: MIN_VOTING_WINDOW_SECS,
            ..Self::production_defaults()
        }
    }

    /// Check that the parameters describe a workable swarm.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&self.max_participants) {
            return Err(ParamsError::MaxParticipants {
                min: MIN_PARTICIPANTS,
                max: MAX_PARTICIPANTS,
                got: self.max_participants,
            });
        }
        if self.min_votes_required == 0 || self.min_votes_required > self.max_participants {
            return Err(ParamsError::MinVotes {
                max_participants: self.max_participants,
                got: self.min_votes_required,
            });
        }
        if self.approval_threshold_bps == 0
            || u64::from(self.approval_threshold_bps) >= BPS_DENOMINATOR
        {
            return Err(ParamsError::ApprovalThreshold(self.approval_threshold_bps));
        }
        if !(MIN_VOTING_WINDOW_SECS..=MAX_VOTING_WINDOW_SECS).contains(&self.voting_window_secs) {
            return Err(ParamsError::VotingWindow {
                min: MIN_VOTING_WINDOW_SECS,
                max: MAX_VOTING_WINDOW_SECS,
                got: self.voting_window_secs,
            });
        }
        if self.max_open_proposals_per_participant == 0 {
            return Err(ParamsError::ProposerCapacity);
        }
        if self.initial_reputation > self.max_reputation {
            return Err(ParamsError::InitialReputation {
                initial: self.initial_reputation,
                max: self.max_reputation,
            });
        }
        Ok(())
    }
}

/// Default is the production configuration.
impl Default for SwarmParams {
    fn default() -> Self {
        Self::production_defaults()
    }
}
