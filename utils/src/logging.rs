//! Tracing subscriber setup for the swarm daemon.
//!
//! The engine logs lifecycle events (registrations, proposals opened and
//! resolved, executions) at `info` under the `swarm_consensus` target, and
//! every recorded ballot at `debug`. Replay and the LMDB log report under
//! `swarm_consensus::replay` and `swarm_store_lmdb`. A typical filter for
//! following votes live is `info,swarm_consensus::engine=debug`.
//!
//! `RUST_LOG` wins over the configured `log_level` when set. JSON output is
//! one object per line, event fields at the top level.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects the output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected human or json)")),
        }
    }
}

/// Initialise the global tracing subscriber.
///
/// Returns quietly if a global subscriber is already installed, so tests and
/// embedders can call it more than once.
pub fn init_logging(format: LogFormat, level: &str) {
    let filter = filter_for(level);
    let result = match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// `RUST_LOG` if set and valid, else the configured level. A configured
/// level that does not parse falls back to `info` rather than silencing logs.
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Human".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn configured_directives_are_kept() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let rendered = filter_for("warn,swarm_consensus::engine=debug").to_string();
        assert!(rendered.contains("swarm_consensus::engine=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn double_init_does_not_panic() {
        init_logging(LogFormat::Human, "warn");
        init_logging(LogFormat::Json, "warn");
    }
}
