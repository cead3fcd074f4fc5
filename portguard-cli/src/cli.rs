//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use portguard_core::config::DEFAULT_CONFIG_PATH;

/// portguard -- XDP TCP port filter control.
///
/// Use `portguard <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "portguard", version, about, long_about = None)]
pub struct Cli {
    /// Path to the portguard.toml configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show packet counters from the running filter.
    Stats(StatsArgs),

    /// Show or change the dropped TCP port without reattaching.
    Port(PortArgs),

    /// Try a TCP connect to local ports and report what happened.
    Probe(ProbeArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

/// Location of the maps pinned by the daemon.
#[derive(Args, Debug, Clone, Default)]
pub struct PinArgs {
    /// bpffs directory holding the pinned maps (default: filter.pin_path).
    #[arg(long)]
    pub pin_path: Option<PathBuf>,
}

// ---- stats ----

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub pins: PinArgs,
}

// ---- port ----

#[derive(Args, Debug)]
pub struct PortArgs {
    #[command(flatten)]
    pub pins: PinArgs,

    #[command(subcommand)]
    pub action: PortAction,
}

#[derive(Subcommand, Debug)]
pub enum PortAction {
    /// Drop TCP traffic to this destination port from the next packet on.
    Set {
        /// Destination port (1-65535).
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,
    },
    /// Remove the configured port; the filter falls back to its default.
    Clear,
    /// Show the configured and effective port.
    Show,
}

// ---- probe ----

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Host to connect to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Per-port connect timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Ports to probe.
    #[arg(required = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub ports: Vec<u16>,
}

// ---- config ----

/// Manage portguard configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, filter, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
