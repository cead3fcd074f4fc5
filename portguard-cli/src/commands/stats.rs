//! `portguard stats` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use portguard_core::config::PortguardConfig;
use portguard_ebpf_engine::portguard_ebpf_common::DEFAULT_TARGET_PORT;
use portguard_ebpf_engine::{FilterStats, PortControl};

use crate::cli::StatsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `stats` command.
pub async fn execute(
    args: StatsArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = PortguardConfig::load_or_default(config_path).await?;
    let pin_path = super::resolve_pin_path(&args.pins, &config);
    debug!(pin_path = %pin_path.display(), "reading filter stats");

    let maps = super::open_maps(&pin_path)?;
    let report = build_report(maps.as_ref(), &pin_path, &config.filter.policy)?;

    writer.render(&report)
}

/// Read both stats slots and the target port into a report.
pub fn build_report(
    maps: &dyn PortControl,
    pin_path: &Path,
    policy: &str,
) -> Result<StatsReport, CliError> {
    let configured = maps.read_target_port()?;
    let stats = FilterStats::from_record(maps.read_stats()?);

    Ok(StatsReport {
        pin_path: pin_path.display().to_string(),
        policy: policy.to_owned(),
        target_port: configured.unwrap_or(DEFAULT_TARGET_PORT),
        target_port_is_default: configured.is_none(),
        stats,
    })
}

/// Counter snapshot of the running filter.
#[derive(Serialize)]
pub struct StatsReport {
    pub pin_path: String,
    /// Policy from the local configuration; only the port policy counts packets.
    pub policy: String,
    /// Port the kernel program drops right now.
    pub target_port: u16,
    pub target_port_is_default: bool,
    #[serde(flatten)]
    pub stats: FilterStats,
}

impl Render for StatsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Filter Stats (pins: {})", self.pin_path.bold())?;
        let suffix = if self.target_port_is_default {
            " (default)"
        } else {
            ""
        };
        writeln!(w, "  Target port:  {}{}", self.target_port, suffix)?;
        writeln!(w, "  Total:        {}", self.stats.total)?;
        writeln!(
            w,
            "  Dropped:      {}",
            self.stats.dropped.to_string().red()
        )?;
        writeln!(
            w,
            "  Passed:       {}",
            self.stats.passed.to_string().green()
        )?;
        writeln!(w, "  Drop ratio:   {:.2}%", self.stats.drop_ratio * 100.0)?;
        if self.policy != "port" {
            writeln!(
                w,
                "  Note: the {} policy does not update these counters",
                self.policy
            )?;
        }
        Ok(())
    }
}
