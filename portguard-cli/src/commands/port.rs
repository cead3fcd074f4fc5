//! `portguard port` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use portguard_core::config::PortguardConfig;
use portguard_ebpf_engine::PortControl;
use portguard_ebpf_engine::portguard_ebpf_common::DEFAULT_TARGET_PORT;

use crate::cli::{PortAction, PortArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `port` command.
pub async fn execute(
    args: PortArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = PortguardConfig::load_or_default(config_path).await?;
    let pin_path = super::resolve_pin_path(&args.pins, &config);

    let mut maps = super::open_maps(&pin_path)?;
    let report = apply(maps.as_mut(), &args.action)?;

    writer.render(&report)
}

/// Run one port action against the maps.
pub fn apply(maps: &mut dyn PortControl, action: &PortAction) -> Result<PortReport, CliError> {
    let label = match action {
        PortAction::Set { port } => {
            if *port == 0 {
                return Err(CliError::Command("port 0 cannot be filtered".to_owned()));
            }
            maps.set_target_port(*port)?;
            info!(port, "target port set");
            "set"
        }
        PortAction::Clear => {
            maps.clear_target_port()?;
            info!("target port cleared");
            "clear"
        }
        PortAction::Show => "show",
    };

    let configured = maps.read_target_port()?;
    Ok(PortReport {
        action: label,
        configured,
        effective: configured.unwrap_or(DEFAULT_TARGET_PORT),
    })
}

/// Target port state after a `port` action.
#[derive(Debug, Serialize)]
pub struct PortReport {
    pub action: &'static str,
    /// Value stored in `TARGET_PORT`, if any.
    pub configured: Option<u16>,
    /// Port the kernel program drops.
    pub effective: u16,
}

impl Render for PortReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match self.configured {
            Some(port) => writeln!(w, "Target port: {}", port.to_string().bold()),
            None => writeln!(
                w,
                "Target port: {} (not set, default)",
                self.effective.to_string().bold()
            ),
        }
    }
}
