//! Swarm daemon — entry point for running the consensus engine.

mod config;
mod simulate;

use anyhow::Context;
use clap::Parser;
use config::SwarmConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swarm_consensus::{ConsensusEngine, ParticipantView, Proposal, SwarmStats};
use swarm_store::EventLog;
use swarm_store_lmdb::LmdbEventLog;
use swarm_types::SystemClock;
use swarm_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "swarm-daemon", about = "Reputation-weighted consensus for agent swarms")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "SWARM_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding the event log.
    #[arg(long, env = "SWARM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SWARM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SWARM_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Use the short development voting window.
    #[arg(long, env = "SWARM_DEV")]
    dev: bool,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay the log and run the expiry sweeper until Ctrl-C.
    Run {
        /// Seconds between expiry sweeps.
        #[arg(long, env = "SWARM_SWEEP_INTERVAL")]
        sweep_interval: Option<u64>,
    },
    /// Drive a scripted swarm against the engine and print the leaderboard.
    Simulate {
        /// Number of scripted agents.
        #[arg(long, default_value_t = 5)]
        agents: usize,
        /// Number of proposals to submit.
        #[arg(long, default_value_t = 10)]
        proposals: usize,
        /// Give up waiting for resolution after this many seconds.
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
    /// Replay the log and print its state as JSON.
    Inspect {
        /// Number of leaderboard entries to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// Output of `inspect`.
#[derive(Serialize)]
struct Inspection {
    events: u64,
    stats: SwarmStats,
    proposals: Vec<Proposal>,
    leaderboard: Vec<ParticipantView>,
}

fn load_config(cli: &Cli) -> anyhow::Result<SwarmConfig> {
    let mut config = match &cli.config {
        Some(path) => SwarmConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SwarmConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if cli.dev {
        config.params.voting_window_secs = swarm_types::SwarmParams::dev_defaults().voting_window_secs;
    }
    if let Command::Run {
        sweep_interval: Some(secs),
    } = &cli.command
    {
        config.sweep_interval_secs = *secs;
    }
    config.params.validate()?;
    Ok(config)
}

fn open_engine(config: &SwarmConfig) -> anyhow::Result<(Arc<ConsensusEngine>, Arc<dyn EventLog>)> {
    let path = config.event_log_path();
    let log: Arc<dyn EventLog> = Arc::new(
        LmdbEventLog::open(&path, config.map_size_bytes())
            .with_context(|| format!("opening event log at {}", path.display()))?,
    );
    let engine = ConsensusEngine::replay(config.params.clone(), Arc::new(SystemClock), log.clone())?;
    Ok((Arc::new(engine), log))
}

async fn run(engine: Arc<ConsensusEngine>, sweep_interval_secs: u64) -> anyhow::Result<()> {
    let stats = engine.stats();
    tracing::info!(
        participants = stats.registered_participants,
        open = stats.open_proposals,
        sweep_every = %format_duration(Duration::from_secs(sweep_interval_secs)),
        "swarm engine running"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                match engine.expire_overdue() {
                    Ok(expired) if !expired.is_empty() => {
                        tracing::info!(count = expired.len(), "sweep expired proposals");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Run { .. } => {
            let (engine, _) = open_engine(&config)?;
            run(engine, config.sweep_interval_secs).await?;
            tracing::info!("swarm daemon exited cleanly");
        }
        Command::Simulate {
            agents,
            proposals,
            timeout_secs,
        } => {
            let (engine, _) = open_engine(&config)?;
            let report =
                simulate::simulate(engine, agents, proposals, Duration::from_secs(timeout_secs)).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Inspect { limit } => {
            let (engine, log) = open_engine(&config)?;
            let inspection = Inspection {
                events: log.len()?,
                stats: engine.stats(),
                proposals: engine.list_proposals(),
                leaderboard: engine.get_leaderboard(limit),
            };
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
    }

    Ok(())
}
