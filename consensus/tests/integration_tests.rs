//! End-to-end tests driving the engine through its public API:
//! registration → proposals → votes → resolution → execution → replay.
//!
//! Time and persistence come from `swarm-nullables`, except for the LMDB
//! round-trip at the end.

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use swarm_consensus::{ConsensusEngine, ConsensusError, ParticipantView, Proposal, SwarmStats};
use swarm_nullables::{NullClock, NullEventLog};
use swarm_store::{EventLog, SequencedEvent, StoreError, SwarmEvent};
use swarm_store_lmdb::LmdbEventLog;
use swarm_types::{
    AgentKind, ExecutionReport, Outcome, ParticipantId, ProposalId, ProposalKind, ProposalStatus,
    SwarmParams, VoteChoice,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const START: u64 = 1_700_000_000;

struct Harness {
    engine: ConsensusEngine,
    clock: Arc<NullClock>,
    log: Arc<NullEventLog>,
}

fn harness(params: SwarmParams) -> Harness {
    let clock = Arc::new(NullClock::new(START));
    let log = Arc::new(NullEventLog::new());
    let engine = ConsensusEngine::new(params, clock.clone(), log.clone()).expect("valid params");
    Harness { engine, clock, log }
}

fn id(name: &str) -> ParticipantId {
    ParticipantId::new(name)
}

fn register_all(engine: &ConsensusEngine, names: &[&str]) {
    for name in names {
        engine
            .register_participant(id(name), AgentKind::Analytics, *name)
            .expect("register");
    }
}

/// Params where everyone starts at reputation 0, i.e. weight 1000.
fn zero_reputation_params() -> SwarmParams {
    SwarmParams {
        initial_reputation: 0,
        ..SwarmParams::default()
    }
}

fn reputation(engine: &ConsensusEngine, name: &str) -> u16 {
    engine.get_participant(&id(name)).expect("participant").reputation
}

// ---------------------------------------------------------------------------
// 1. Documented scenarios
// ---------------------------------------------------------------------------

#[test]
fn weighted_majority_approves_without_waiting() {
    let h = harness(zero_reputation_params());
    register_all(&h.engine, &["a", "b", "c", "d", "e"]);
    // b -> reputation 10 (weight 1100), c -> reputation 5 (weight 1050)
    h.engine.apply_performance_score(&id("b"), 600).unwrap();
    h.engine.apply_performance_score(&id("c"), 550).unwrap();
    assert_eq!(h.engine.get_participant(&id("a")).unwrap().vote_weight, 1_000);
    assert_eq!(h.engine.get_participant(&id("b")).unwrap().vote_weight, 1_100);
    assert_eq!(h.engine.get_participant(&id("c")).unwrap().vote_weight, 1_050);

    let pid = h
        .engine
        .create_proposal(&id("d"), ProposalKind::Rebalance, b"60/40".to_vec(), "rebalance")
        .unwrap();
    h.engine.submit_vote(pid, &id("a"), VoteChoice::Approve, "good").unwrap();
    let r = h.engine.submit_vote(pid, &id("b"), VoteChoice::Approve, "good").unwrap();
    assert_eq!(r.status, ProposalStatus::Open);

    let r = h.engine.submit_vote(pid, &id("c"), VoteChoice::Reject, "risky").unwrap();
    assert_eq!(r.tally.for_weight, 2_100);
    assert_eq!(r.tally.against_weight, 1_050);
    assert_eq!(r.tally.participation, 3);
    assert_eq!(r.status, ProposalStatus::Approved);

    let outcome = r.outcome.expect("terminating vote carries the outcome");
    assert_eq!(outcome.final_status, ProposalStatus::Approved);
    assert_eq!(h.engine.get_outcome(pid), Some(outcome));

    // majority bonus to approvers only, nothing for the proposer yet
    assert_eq!(reputation(&h.engine, "a"), 5);
    assert_eq!(reputation(&h.engine, "b"), 15);
    assert_eq!(reputation(&h.engine, "c"), 5);
    assert_eq!(reputation(&h.engine, "d"), 0);
}

#[test]
fn weighted_minority_rejects_immediately() {
    let h = harness(zero_reputation_params());
    register_all(&h.engine, &["a", "b", "c", "d", "e"]);
    let pid = h
        .engine
        .create_proposal(&id("e"), ProposalKind::Trade, Vec::new(), "buy")
        .unwrap();

    h.engine.submit_vote(pid, &id("a"), VoteChoice::Approve, "").unwrap();
    h.engine.submit_vote(pid, &id("b"), VoteChoice::Reject, "").unwrap();
    let r = h.engine.submit_vote(pid, &id("c"), VoteChoice::Reject, "").unwrap();

    assert_eq!(r.tally.for_weight, 1_000);
    assert_eq!(r.tally.against_weight, 2_000);
    assert_eq!(r.status, ProposalStatus::Rejected);

    // proposer penalty clamps at zero, rejecters gain
    assert_eq!(reputation(&h.engine, "e"), 0);
    assert_eq!(reputation(&h.engine, "b"), 5);
    assert_eq!(reputation(&h.engine, "c"), 5);
    assert_eq!(reputation(&h.engine, "a"), 0);
}

#[test]
fn undecided_proposal_expires_rather_than_rejects() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c", "d", "e"]);
    let pid = h
        .engine
        .create_proposal(&id("a"), ProposalKind::Strategy, Vec::new(), "switch")
        .unwrap();
    h.engine.submit_vote(pid, &id("a"), VoteChoice::Approve, "").unwrap();
    h.engine.submit_vote(pid, &id("b"), VoteChoice::Reject, "").unwrap();
    let revision = h.engine.ledger().revision();

    h.clock.advance(SwarmParams::default().voting_window_secs);
    assert!(h.engine.expire_overdue().unwrap().is_empty(), "deadline itself is still open");

    h.clock.advance(1);
    assert_eq!(h.engine.expire_overdue().unwrap(), vec![pid]);
    assert!(h.engine.expire_overdue().unwrap().is_empty());

    let proposal = h.engine.get_proposal(pid).unwrap();
    assert_eq!(proposal.status(), ProposalStatus::Expired);
    assert_eq!(h.engine.get_outcome(pid).unwrap().participation_count, 2);
    assert_eq!(h.engine.ledger().revision(), revision, "expiry is not punitive");
}

#[test]
fn zero_reputation_votes_with_base_weight() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c"]);
    for _ in 0..25 {
        h.engine.apply_performance_score(&id("a"), 0).unwrap();
    }
    assert_eq!(reputation(&h.engine, "a"), 0);

    let pid = h.engine.create_proposal(&id("b"), ProposalKind::Custom, Vec::new(), "").unwrap();
    let r = h.engine.submit_vote(pid, &id("a"), VoteChoice::Approve, "").unwrap();
    assert_eq!(r.tally.for_weight, 1_000);
}

// ---------------------------------------------------------------------------
// 2. Lifecycle rules
// ---------------------------------------------------------------------------

#[test]
fn terminal_proposals_refuse_votes() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c", "d"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();
    for voter in ["a", "b", "c"] {
        h.engine.submit_vote(pid, &id(voter), VoteChoice::Approve, "").unwrap();
    }
    let before = h.engine.get_proposal(pid).unwrap();

    let err = h
        .engine
        .submit_vote(pid, &id("d"), VoteChoice::Reject, "")
        .unwrap_err();
    assert!(matches!(
        err,
        ConsensusError::ProposalClosed { status: ProposalStatus::Approved, .. }
    ));
    assert_eq!(h.engine.get_proposal(pid).unwrap(), before);
}

#[test]
fn overwrite_before_termination_keeps_one_ballot() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c", "d", "e"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();

    let first = h.engine.submit_vote(pid, &id("b"), VoteChoice::Approve, "").unwrap();
    assert!(!first.overwrite);
    let again = h.engine.submit_vote(pid, &id("b"), VoteChoice::Approve, "").unwrap();
    assert!(again.overwrite);
    assert_eq!(again.tally, first.tally);

    let flipped = h.engine.submit_vote(pid, &id("b"), VoteChoice::Reject, "changed my mind").unwrap();
    assert_eq!(flipped.tally.participation, 1);
    assert_eq!(flipped.tally.for_weight, 0);
    assert_eq!(flipped.tally.against_weight, 11_000);

    let proposal = h.engine.get_proposal(pid).unwrap();
    assert_eq!(proposal.votes().count(), 1);
    assert_eq!(h.engine.registry().get(&id("b")).unwrap().votes_cast, 1);
}

#[test]
fn unauthorized_votes_are_rejected() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();

    assert!(matches!(
        h.engine.submit_vote(pid, &id("mallory"), VoteChoice::Approve, ""),
        Err(ConsensusError::UnauthorizedVoter(_))
    ));
    h.engine.deactivate_participant(&id("c")).unwrap();
    assert!(matches!(
        h.engine.submit_vote(pid, &id("c"), VoteChoice::Approve, ""),
        Err(ConsensusError::UnauthorizedVoter(_))
    ));
    assert!(matches!(
        h.engine.submit_vote(ProposalId::new(42), &id("a"), VoteChoice::Approve, ""),
        Err(ConsensusError::ProposalNotFound(_))
    ));
    assert_eq!(h.engine.get_proposal(pid).unwrap().tally().participation, 0);
}

#[test]
fn everyone_voting_below_quorum_rejects() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::RiskLimit, Vec::new(), "").unwrap();

    let r = h.engine.submit_vote(pid, &id("a"), VoteChoice::Approve, "").unwrap();
    assert_eq!(r.status, ProposalStatus::Open);
    let r = h.engine.submit_vote(pid, &id("b"), VoteChoice::Approve, "").unwrap();
    assert_eq!(r.status, ProposalStatus::Rejected);
    assert_eq!(reputation(&h.engine, "a"), 970);
}

#[test]
fn all_abstain_quorum_rejects() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c", "d"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();
    for voter in ["b", "c", "d"] {
        h.engine.submit_vote(pid, &id(voter), VoteChoice::Abstain, "").unwrap();
    }
    let proposal = h.engine.get_proposal(pid).unwrap();
    assert_eq!(proposal.status(), ProposalStatus::Rejected);
    // abstainers get no majority bonus
    assert_eq!(reputation(&h.engine, "b"), 1_000);
}

#[test]
fn deactivated_proposer_proposal_continues() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c", "d"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();
    h.engine.deactivate_participant(&id("a")).unwrap();

    assert!(matches!(
        h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), ""),
        Err(ConsensusError::UnauthorizedProposer(_))
    ));
    for voter in ["b", "c", "d"] {
        h.engine.submit_vote(pid, &id(voter), VoteChoice::Approve, "").unwrap();
    }
    assert_eq!(h.engine.get_proposal(pid).unwrap().status(), ProposalStatus::Approved);
}

#[test]
fn registry_cap_counts_active_participants() {
    let params = SwarmParams {
        max_participants: 3,
        ..SwarmParams::default()
    };
    let h = harness(params);
    register_all(&h.engine, &["a", "b", "c"]);
    assert!(matches!(
        h.engine.register_participant(id("d"), AgentKind::Learning, "d"),
        Err(ConsensusError::RegistryFull { capacity: 3 })
    ));
    assert!(matches!(
        h.engine.register_participant(id("a"), AgentKind::Learning, "a"),
        Err(ConsensusError::AlreadyRegistered(_))
    ));

    h.engine.deactivate_participant(&id("a")).unwrap();
    h.engine.register_participant(id("d"), AgentKind::Learning, "d").unwrap();
    assert!(matches!(
        h.engine.reactivate_participant(&id("a")),
        Err(ConsensusError::RegistryFull { .. })
    ));
}

// ---------------------------------------------------------------------------
// 3. Execution feedback
// ---------------------------------------------------------------------------

fn approved_proposal(h: &Harness) -> ProposalId {
    register_all(&h.engine, &["a", "b", "c"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();
    for voter in ["b", "c", "a"] {
        h.engine.submit_vote(pid, &id(voter), VoteChoice::Approve, "").unwrap();
    }
    pid
}

#[test]
fn execution_success_credits_proposer_once() {
    let h = harness(SwarmParams::default());
    let pid = approved_proposal(&h);
    assert_eq!(reputation(&h.engine, "a"), 1_005);

    let status = h.engine.on_execution_result(pid, true, b"filled".to_vec()).unwrap();
    assert_eq!(status, ProposalStatus::Executed);
    assert_eq!(reputation(&h.engine, "a"), 1_055);
    assert_eq!(h.engine.registry().get(&id("a")).unwrap().successful_proposals, 1);

    assert!(matches!(
        h.engine.on_execution_result(pid, true, Vec::new()),
        Err(ConsensusError::InvalidTransition { from: ProposalStatus::Executed, .. })
    ));
    assert_eq!(reputation(&h.engine, "a"), 1_055);
    assert_eq!(h.engine.execution_reports(pid).len(), 1);
}

#[test]
fn execution_failure_is_flagged_not_reverted() {
    let h = harness(SwarmParams::default());
    let pid = approved_proposal(&h);

    let status = h.engine.on_execution_result(pid, false, b"slippage".to_vec()).unwrap();
    assert_eq!(status, ProposalStatus::Approved);
    let proposal = h.engine.get_proposal(pid).unwrap();
    assert!(proposal.execution_failed());
    assert_eq!(reputation(&h.engine, "a"), 1_005);

    // a retry may still succeed
    h.engine.on_execution_result(pid, true, Vec::new()).unwrap();
    assert_eq!(h.engine.get_proposal(pid).unwrap().status(), ProposalStatus::Executed);
    assert_eq!(h.engine.execution_reports(pid).len(), 2);
}

// ---------------------------------------------------------------------------
// 4. Failure atomicity
// ---------------------------------------------------------------------------

#[test]
fn failed_resolution_leaves_no_trace() {
    let h = harness(SwarmParams::default());
    register_all(&h.engine, &["a", "b", "c"]);
    let pid = h.engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();
    h.engine.submit_vote(pid, &id("a"), VoteChoice::Approve, "").unwrap();
    h.engine.submit_vote(pid, &id("b"), VoteChoice::Approve, "").unwrap();
    let before = h.engine.get_proposal(pid).unwrap();
    let events = h.log.events().len();

    h.log.fail_appends(true);
    assert!(matches!(
        h.engine.submit_vote(pid, &id("c"), VoteChoice::Approve, ""),
        Err(ConsensusError::Store(_))
    ));
    assert_eq!(h.engine.get_proposal(pid).unwrap(), before);
    assert!(h.engine.get_outcome(pid).is_none());
    assert_eq!(reputation(&h.engine, "a"), 1_000);
    assert_eq!(h.log.events().len(), events);

    h.log.fail_appends(false);
    let r = h.engine.submit_vote(pid, &id("c"), VoteChoice::Approve, "").unwrap();
    assert_eq!(r.status, ProposalStatus::Approved);
}

#[test]
fn terminating_vote_is_one_batch() {
    let h = harness(SwarmParams::default());
    let _pid = approved_proposal(&h);
    let events = h.log.events();
    let tail: Vec<&str> = events[events.len() - 5..].iter().map(SwarmEvent::label).collect();
    assert_eq!(
        tail,
        vec![
            "vote_cast",
            "proposal_resolved",
            "reputation_adjusted",
            "reputation_adjusted",
            "reputation_adjusted",
        ]
    );
}

// ---------------------------------------------------------------------------
// 5. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_voters_resolve_every_proposal_once() {
    let names: Vec<String> = (0..10).map(|i| format!("agent-{i:02}")).collect();
    let params = SwarmParams {
        min_votes_required: 10,
        ..SwarmParams::default()
    };
    let h = harness(params);
    let engine = Arc::new(h.engine);
    for name in &names {
        engine.register_participant(id(name), AgentKind::Consensus, name.as_str()).unwrap();
    }
    let proposals: Vec<ProposalId> = names[..5]
        .iter()
        .map(|name| engine.create_proposal(&id(name), ProposalKind::Trade, Vec::new(), "").unwrap())
        .collect();

    let handles: Vec<_> = names
        .iter()
        .cloned()
        .map(|name| {
            let engine = engine.clone();
            let proposals = proposals.clone();
            std::thread::spawn(move || {
                for pid in proposals {
                    engine.submit_vote(pid, &id(&name), VoteChoice::Approve, "").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for pid in &proposals {
        let proposal = engine.get_proposal(*pid).unwrap();
        assert_eq!(proposal.status(), ProposalStatus::Approved);
        assert_eq!(proposal.tally().participation, 10);
        assert_eq!(proposal.votes().count(), 10);
    }
    // five approvals, +5 each
    for name in &names {
        assert_eq!(reputation(&engine, name), 1_025);
    }
    let resolved = h
        .log
        .events()
        .iter()
        .filter(|e| matches!(e, SwarmEvent::ProposalResolved { .. }))
        .count();
    assert_eq!(resolved, 5);
}

/// An in-memory log that parks the first append matching `gate` until the
/// test releases it, so tests can observe the engine mid-write.
struct GatedLog {
    inner: NullEventLog,
    gate: fn(&SwarmEvent) -> bool,
    parked: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl EventLog for GatedLog {
    fn append(&self, events: &[SwarmEvent]) -> Result<u64, StoreError> {
        if events.iter().any(self.gate) {
            let parked = self.parked.lock().unwrap().take();
            if let Some(parked) = parked {
                parked.send(()).unwrap();
                let _ = self.release.lock().unwrap().recv();
            }
        }
        self.inner.append(events)
    }

    fn read_all(&self) -> Result<Vec<SequencedEvent>, StoreError> {
        self.inner.read_all()
    }

    fn len(&self) -> Result<u64, StoreError> {
        self.inner.len()
    }
}

/// Park `write`'s append and check that an unrelated vote still completes.
fn vote_completes_during(gate: fn(&SwarmEvent) -> bool, write: fn(&ConsensusEngine)) {
    let (parked_tx, parked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let log = Arc::new(GatedLog {
        inner: NullEventLog::new(),
        gate,
        parked: Mutex::new(Some(parked_tx)),
        release: Mutex::new(release_rx),
    });
    let engine = Arc::new(
        ConsensusEngine::new(SwarmParams::default(), Arc::new(NullClock::new(START)), log).unwrap(),
    );
    register_all(&engine, &["a", "b", "c", "d"]);
    let pid = engine.create_proposal(&id("a"), ProposalKind::Trade, Vec::new(), "").unwrap();

    let writer = {
        let engine = engine.clone();
        std::thread::spawn(move || write(&engine))
    };
    parked_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("write reached the log");

    let (done_tx, done_rx) = mpsc::channel();
    let voter = {
        let engine = engine.clone();
        std::thread::spawn(move || {
            let result = engine.submit_vote(pid, &id("c"), VoteChoice::Approve, "");
            done_tx.send(result.map(|r| r.tally.participation)).unwrap();
        })
    };
    let participation = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("vote waited on an unrelated write");
    assert_eq!(participation.unwrap(), 1);

    release_tx.send(()).unwrap();
    writer.join().unwrap();
    voter.join().unwrap();
}

#[test]
fn vote_does_not_wait_for_another_proposals_creation() {
    vote_completes_during(
        |e| matches!(e, SwarmEvent::ProposalCreated { id, .. } if *id == ProposalId::new(2)),
        |engine| {
            let created = engine.create_proposal(&id("b"), ProposalKind::Strategy, Vec::new(), "").unwrap();
            assert_eq!(created, ProposalId::new(2));
        },
    );
}

#[test]
fn vote_does_not_wait_for_a_registry_change() {
    vote_completes_during(
        |e| matches!(e, SwarmEvent::ParticipantDeactivated { .. }),
        |engine| assert!(engine.deactivate_participant(&id("d")).unwrap()),
    );
}

/// Params under which no reputation moves, so open tallies replay exactly
/// even when resolutions interleave with votes.
fn flat_reputation_params() -> SwarmParams {
    SwarmParams {
        min_votes_required: 5,
        max_open_proposals_per_participant: 10,
        proposer_rejected_penalty: 0,
        majority_voter_bonus: 0,
        ..SwarmParams::default()
    }
}

#[test]
fn liveness_changes_racing_votes_replay_identically() {
    let voters = ["a", "b", "c", "d", "v"];
    let h = harness(flat_reputation_params());
    let engine = Arc::new(h.engine);
    register_all(&engine, &voters);
    let proposals: Vec<ProposalId> = (0..20)
        .map(|i| {
            let proposer = id(voters[i % 4]);
            engine.create_proposal(&proposer, ProposalKind::Trade, Vec::new(), "").unwrap()
        })
        .collect();

    let toggler = {
        let engine = engine.clone();
        std::thread::spawn(move || {
            for _ in 0..200 {
                engine.deactivate_participant(&id("v")).unwrap();
                engine.reactivate_participant(&id("v")).unwrap();
            }
        })
    };
    let handles: Vec<_> = voters
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let engine = engine.clone();
            let proposals = proposals.clone();
            let name = name.to_string();
            std::thread::spawn(move || {
                for round in 0..3 {
                    for (j, pid) in proposals.iter().enumerate() {
                        let choice = if (i + j + round) % 3 == 0 {
                            VoteChoice::Reject
                        } else {
                            VoteChoice::Approve
                        };
                        match engine.submit_vote(*pid, &id(&name), choice, "") {
                            Ok(_)
                            | Err(ConsensusError::UnauthorizedVoter(_))
                            | Err(ConsensusError::ProposalClosed { .. }) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                }
            })
        })
        .collect();
    toggler.join().unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    let replayed = ConsensusEngine::replay(flat_reputation_params(), h.clock.clone(), h.log.clone())
        .expect("log written under concurrency replays");
    assert_eq!(snapshot(&replayed), snapshot(&engine));
    assert!(replayed.registry().is_active(&id("v")));
}

// ---------------------------------------------------------------------------
// 6. Replay
// ---------------------------------------------------------------------------

fn scripted_history(engine: &ConsensusEngine, clock: &NullClock) {
    register_all(engine, &["a", "b", "c", "d", "e"]);
    engine.apply_performance_score(&id("e"), 900).unwrap();

    let approved = engine.create_proposal(&id("a"), ProposalKind::Rebalance, vec![1], "one").unwrap();
    let rejected = engine.create_proposal(&id("b"), ProposalKind::Trade, vec![2], "two").unwrap();
    let expired = engine.create_proposal(&id("c"), ProposalKind::Strategy, vec![3], "three").unwrap();
    // never voted on; expires in the sweep below
    engine.create_proposal(&id("d"), ProposalKind::RiskLimit, vec![4], "four").unwrap();

    for voter in ["a", "b", "e"] {
        engine.submit_vote(approved, &id(voter), VoteChoice::Approve, "ok").unwrap();
    }
    engine.on_execution_result(approved, false, b"retry".to_vec()).unwrap();
    engine.on_execution_result(approved, true, b"done".to_vec()).unwrap();

    engine.submit_vote(rejected, &id("c"), VoteChoice::Approve, "").unwrap();
    engine.submit_vote(rejected, &id("c"), VoteChoice::Reject, "changed").unwrap();
    engine.submit_vote(rejected, &id("d"), VoteChoice::Reject, "").unwrap();
    engine.submit_vote(expired, &id("a"), VoteChoice::Abstain, "").unwrap();
    engine.submit_vote(rejected, &id("e"), VoteChoice::Reject, "").unwrap();

    engine.deactivate_participant(&id("d")).unwrap();
    clock.advance(7_201);
    engine.expire_overdue().unwrap();
    let late = engine.create_proposal(&id("e"), ProposalKind::Emergency, vec![5], "five").unwrap();
    engine.submit_vote(late, &id("a"), VoteChoice::Approve, "").unwrap();
    engine.reactivate_participant(&id("d")).unwrap();
}

/// Everything observable through the read side.
#[derive(Debug, PartialEq)]
struct Snapshot {
    proposals: Vec<Proposal>,
    leaderboard: Vec<ParticipantView>,
    stats: SwarmStats,
    outcomes: Vec<Option<Outcome>>,
    executions: Vec<Vec<ExecutionReport>>,
}

fn snapshot(engine: &ConsensusEngine) -> Snapshot {
    let proposals = engine.list_proposals();
    Snapshot {
        outcomes: proposals.iter().map(|p| engine.get_outcome(p.id())).collect(),
        executions: proposals.iter().map(|p| engine.execution_reports(p.id())).collect(),
        leaderboard: engine.get_leaderboard(10),
        stats: engine.stats(),
        proposals,
    }
}

#[test]
fn replay_rebuilds_identical_state() {
    let h = harness(SwarmParams::default());
    scripted_history(&h.engine, &h.clock);

    let replayed = ConsensusEngine::replay(SwarmParams::default(), h.clock.clone(), h.log.clone()).unwrap();
    assert_eq!(snapshot(&replayed), snapshot(&h.engine));

    let stats = replayed.stats();
    assert_eq!(stats.executed_proposals, 1);
    assert_eq!(stats.rejected_proposals, 1);
    assert_eq!(stats.expired_proposals, 2);
    assert_eq!(stats.open_proposals, 1);
}

#[test]
fn replay_through_lmdb() {
    let dir = tempfile::tempdir().expect("temp dir");
    let clock = Arc::new(NullClock::new(START));
    // the first engine and its environment are dropped before reopening
    let original = {
        let log: Arc<dyn EventLog> = Arc::new(LmdbEventLog::open(dir.path(), 16 * 1024 * 1024).unwrap());
        let engine = ConsensusEngine::new(SwarmParams::default(), clock.clone(), log).unwrap();
        scripted_history(&engine, &clock);
        snapshot(&engine)
    };

    let log: Arc<dyn EventLog> = Arc::new(LmdbEventLog::open(dir.path(), 16 * 1024 * 1024).unwrap());
    let replayed = ConsensusEngine::replay(SwarmParams::default(), clock, log).unwrap();
    assert_eq!(snapshot(&replayed), original);
}
