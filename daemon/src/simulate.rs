//! Scripted swarm simulation.
//!
//! Each agent runs as its own tokio task, polling the engine for open
//! proposals and voting through its [`Decider`]. The driver submits
//! proposals round-robin, waits for them to resolve, then plays the
//! execution layer for the approved ones.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use swarm_consensus::{ConsensusEngine, ConsensusError, Decider, ParticipantView, Proposal, SwarmStats};
use swarm_types::{AgentKind, ParticipantId, ProposalId, ProposalKind, ProposalStatus, VoteChoice};
use swarm_utils::format_duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

const ROLES: [AgentKind; 6] = [
    AgentKind::Analytics,
    AgentKind::RiskManagement,
    AgentKind::Execution,
    AgentKind::Learning,
    AgentKind::Security,
    AgentKind::Arbitrage,
];

const PROPOSAL_KINDS: [ProposalKind; 5] = [
    ProposalKind::Rebalance,
    ProposalKind::Trade,
    ProposalKind::RiskLimit,
    ProposalKind::Strategy,
    ProposalKind::Emergency,
];

/// Deterministic voting behaviour derived from a per-agent seed.
pub struct ScriptedDecider {
    seed: u64,
    role: AgentKind,
}

impl ScriptedDecider {
    pub fn new(seed: u64, role: AgentKind) -> Self {
        Self { seed, role }
    }
}

impl Decider for ScriptedDecider {
    fn decide(&self, proposal: &Proposal) -> (VoteChoice, String) {
        let roll = (proposal.id().as_u64().wrapping_mul(31) ^ self.seed) % 10;
        let cautious = matches!(self.role, AgentKind::RiskManagement | AgentKind::Security);
        match (proposal.kind(), roll) {
            (ProposalKind::Emergency, r) if cautious || r < 4 => (
                VoteChoice::Reject,
                format!("{}: emergency action needs broader review", self.role.name()),
            ),
            (_, 0..=5) => (
                VoteChoice::Approve,
                format!("{}: expected value positive", self.role.name()),
            ),
            (_, 6..=7) => (
                VoteChoice::Reject,
                format!("{}: risk outweighs benefit", self.role.name()),
            ),
            _ => (VoteChoice::Abstain, format!("{}: no signal", self.role.name())),
        }
    }
}

/// Summary printed at the end of a simulation.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub elapsed: String,
    pub votes_cast: u32,
    pub proposals: Vec<ProposalId>,
    pub timed_out: bool,
    pub stats: SwarmStats,
    pub leaderboard: Vec<ParticipantView>,
}

/// Run `agents` scripted participants against `proposals` new proposals.
pub async fn simulate(
    engine: Arc<ConsensusEngine>,
    agents: usize,
    proposals: usize,
    timeout: Duration,
) -> anyhow::Result<SimulationReport> {
    let max = engine.params().max_participants as usize;
    if agents == 0 || agents > max {
        anyhow::bail!("--agents must be between 1 and {max}");
    }
    let started = Instant::now();

    let ids: Vec<ParticipantId> = (0..agents).map(|i| ParticipantId::new(format!("agent-{i:02}"))).collect();
    for (i, id) in ids.iter().enumerate() {
        let role = ROLES[i % ROLES.len()];
        match engine.register_participant(id.clone(), role, format!("{} #{i}", role.name())) {
            Ok(_) => {}
            Err(ConsensusError::AlreadyRegistered(_)) => {
                engine.reactivate_participant(id)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let handles: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let role = ROLES[i % ROLES.len()];
            let decider: Arc<dyn Decider> = Arc::new(ScriptedDecider::new(i as u64 * 7 + 3, role));
            tokio::spawn(run_agent(engine.clone(), id.clone(), decider, stop_rx.clone()))
        })
        .collect();

    let submitted = tokio::time::timeout(timeout, drive(&engine, &ids, proposals)).await;
    let (created, timed_out) = match submitted {
        Ok(result) => (result?, false),
        Err(_) => {
            warn!(timeout = %format_duration(timeout), "simulation timed out");
            (Vec::new(), true)
        }
    };

    let _ = stop_tx.send(true);
    let mut votes_cast = 0;
    for handle in handles {
        votes_cast += handle.await?;
    }

    for id in &created {
        if engine.get_proposal(*id)?.status() == ProposalStatus::Approved {
            let success = id.as_u64() % 5 != 0;
            let metrics = format!("slippage_bps={}", id.as_u64() % 13).into_bytes();
            engine.on_execution_result(*id, success, metrics)?;
        }
    }

    let elapsed = format_duration(started.elapsed());
    info!(%elapsed, votes_cast, proposals = created.len(), "simulation finished");
    Ok(SimulationReport {
        elapsed,
        votes_cast,
        proposals: created,
        timed_out,
        stats: engine.stats(),
        leaderboard: engine.get_leaderboard(agents),
    })
}

/// Submit the proposals and wait until none of them is Open.
async fn drive(
    engine: &ConsensusEngine,
    ids: &[ParticipantId],
    count: usize,
) -> anyhow::Result<Vec<ProposalId>> {
    let mut created = Vec::with_capacity(count);
    for j in 0..count {
        let proposer = &ids[j % ids.len()];
        let kind = PROPOSAL_KINDS[j % PROPOSAL_KINDS.len()];
        let payload = format!("{kind:?}-{j}").into_bytes();
        loop {
            match engine.create_proposal(proposer, kind, payload.clone(), format!("{kind:?} #{j}")) {
                Ok(id) => {
                    created.push(id);
                    break;
                }
                Err(ConsensusError::ProposerAtCapacity { .. }) => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    loop {
        let mut open = 0;
        for id in &created {
            if engine.get_proposal(*id)?.status().is_open() {
                open += 1;
            }
        }
        if open == 0 {
            return Ok(created);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn run_agent(
    engine: Arc<ConsensusEngine>,
    id: ParticipantId,
    decider: Arc<dyn Decider>,
    mut stop: watch::Receiver<bool>,
) -> u32 {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    let mut cast = 0;
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = interval.tick() => {
                let open = match engine.list_open_proposals() {
                    Ok(open) => open,
                    Err(e) => {
                        warn!(agent = %id, error = %e, "cannot list proposals");
                        Vec::new()
                    }
                };
                for proposal in open.iter().filter(|p| !p.has_voted(&id)) {
                    let (choice, reasoning) = decider.decide(proposal);
                    match engine.submit_vote(proposal.id(), &id, choice, reasoning) {
                        Ok(receipt) => {
                            cast += 1;
                            debug!(agent = %id, proposal = %proposal.id(), ?choice, status = %receipt.status, "voted");
                        }
                        // resolved between listing and voting
                        Err(ConsensusError::ProposalClosed { .. }) => {}
                        Err(e) => warn!(agent = %id, proposal = %proposal.id(), error = %e, "vote rejected"),
                    }
                }
            }
        }
    }
    cast
}
