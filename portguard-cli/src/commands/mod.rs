//! Command handlers -- one module per subcommand

pub mod config;
pub mod port;
pub mod probe;
pub mod stats;

use std::path::{Path, PathBuf};

use portguard_core::config::PortguardConfig;
use portguard_ebpf_engine::PortControl;

use crate::cli::PinArgs;
use crate::error::CliError;

/// Pin directory: `--pin-path` if given, else `filter.pin_path` from the config.
pub(crate) fn resolve_pin_path(pins: &PinArgs, config: &PortguardConfig) -> PathBuf {
    pins.pin_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.filter.pin_path))
}

/// Open the maps pinned by a running daemon.
#[cfg(target_os = "linux")]
pub(crate) fn open_maps(pin_path: &Path) -> Result<Box<dyn PortControl>, CliError> {
    portguard_ebpf_engine::FilterMaps::from_pins(pin_path)
        .map(|maps| Box::new(maps) as Box<dyn PortControl>)
        .map_err(|e| {
            CliError::MapsUnavailable(format!(
                "{e} (is portguard-daemon running with pin path {}?)",
                pin_path.display()
            ))
        })
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn open_maps(_pin_path: &Path) -> Result<Box<dyn PortControl>, CliError> {
    Err(CliError::MapsUnavailable(
        "eBPF maps are only available on Linux".to_owned(),
    ))
}
