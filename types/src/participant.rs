//! Participant identity and agent roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, externally authenticated participant identifier.
///
/// Ordering is lexicographic on the raw key, which is what makes
/// leaderboard tie-breaks deterministic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The role an agent plays in the swarm.
///
/// Purely descriptive: the engine never branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Coordinates decision-making.
    Consensus,
    /// Analyzes data and generates insights.
    Analytics,
    /// Executes approved actions.
    Execution,
    /// Monitors and enforces risk limits.
    RiskManagement,
    /// Adapts strategies based on outcomes.
    Learning,
    Governance,
    Security,
    Liquidity,
    Arbitrage,
    /// Community-defined role.
    Custom(u8),
}

impl AgentKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Consensus => "consensus",
            Self::Analytics => "analytics",
            Self::Execution => "execution",
            Self::RiskManagement => "risk_management",
            Self::Learning => "learning",
            Self::Governance => "governance",
            Self::Security => "security",
            Self::Liquidity => "liquidity",
            Self::Arbitrage => "arbitrage",
            Self::Custom(_) => "custom",
        }
    }
}
