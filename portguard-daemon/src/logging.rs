//! Tracing setup for portguard-daemon.
//!
//! `general.log_level` (after env and CLI overrides) applies to the portguard
//! crates only; everything else, aya included, stays at `warn`. A non-empty
//! `RUST_LOG` replaces the whole filter.

use std::str::FromStr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use portguard_core::config::GeneralConfig;

/// Crates whose events follow `general.log_level`.
const PORTGUARD_TARGETS: [&str; 3] = ["portguard_daemon", "portguard_ebpf_engine", "portguard_core"];

/// Output format of the daemon's log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            )),
        }
    }
}

/// Filter directives for `level`, e.g. `warn,portguard_daemon=debug,...`.
pub fn filter_directives(level: &str) -> String {
    PORTGUARD_TARGETS
        .iter()
        .fold(String::from("warn"), |mut directives, target| {
            directives.push_str(&format!(",{target}={level}"));
            directives
        })
}

/// Build the event filter; `rust_log` wins when set and non-empty.
pub fn build_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter> {
    let directives = match rust_log {
        Some(value) if !value.trim().is_empty() => value.to_owned(),
        _ => filter_directives(level),
    };
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("invalid log filter '{}': {}", directives, e))
}

/// Install the global subscriber. Call once, before the first event.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(&config.log_level, rust_log.as_deref())?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
