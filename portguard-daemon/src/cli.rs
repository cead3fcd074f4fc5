//! CLI argument definitions for portguard-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! Flags that mirror config keys are collected into [`ConfigOverrides`],
//! which is re-applied on every SIGHUP reload so they keep the highest precedence.

use std::path::PathBuf;

use clap::Parser;

use portguard_core::config::{DEFAULT_CONFIG_PATH, PortguardConfig};

/// portguard XDP port filter daemon.
///
/// Loads the XDP program for the configured policy, attaches it to an
/// interface, polls its counters and applies target-port changes on SIGHUP.
#[derive(Parser, Debug)]
#[command(name = "portguard-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to portguard.toml configuration file.
    ///
    /// A missing file is not an error: built-in defaults are used.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Network interface to attach to (overrides filter.interface).
    #[arg(short, long)]
    pub interface: Option<String>,

    /// TCP destination port dropped by the port policy (overrides filter.target_port).
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Filter policy: port or process (overrides filter.policy).
    #[arg(long)]
    pub policy: Option<String>,

    /// XDP attach mode: skb, native or hw (overrides filter.xdp_mode).
    #[arg(long)]
    pub xdp_mode: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Collect the flags that override configuration values.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            interface: self.interface.clone(),
            target_port: self.port,
            policy: self.policy.clone(),
            xdp_mode: self.xdp_mode.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
        }
    }
}

/// Command-line values layered on top of file and environment configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub interface: Option<String>,
    pub target_port: Option<u16>,
    pub policy: Option<String>,
    pub xdp_mode: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl ConfigOverrides {
    /// Write every set override into `config`.
    pub fn apply(&self, config: &mut PortguardConfig) {
        if let Some(interface) = &self.interface {
            config.filter.interface.clone_from(interface);
        }
        if let Some(port) = self.target_port {
            config.filter.target_port = port;
        }
        if let Some(policy) = &self.policy {
            config.filter.policy.clone_from(policy);
        }
        if let Some(mode) = &self.xdp_mode {
            config.filter.xdp_mode.clone_from(mode);
        }
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
