//! Configuration reload planning.
//!
//! On SIGHUP the daemon re-reads its configuration and compares it with the
//! running one. Only settings that can change without reattaching the XDP
//! program are applied; the rest are reported and keep their running values.
//!
//! `TARGET_PORT` can also be written by `portguard port set` behind the
//! daemon's back, so the target port is compared against the live map too.

use std::time::Duration;

use portguard_core::config::PortguardConfig;

/// What a reload changes in a running daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadPlan {
    /// New target port to write into `TARGET_PORT`.
    pub target_port: Option<u16>,
    /// New stats polling interval.
    pub stats_interval: Option<Duration>,
    /// Changed settings that only take effect after a restart.
    pub restart_required: Vec<&'static str>,
}

impl ReloadPlan {
    /// Compare the running configuration with a freshly loaded one.
    pub fn diff(current: &PortguardConfig, next: &PortguardConfig) -> Self {
        let mut plan = Self::default();

        if current.filter.target_port != next.filter.target_port {
            plan.target_port = Some(next.filter.target_port);
        }
        if current.filter.stats_interval_secs != next.filter.stats_interval_secs {
            plan.stats_interval = Some(Duration::from_secs(next.filter.stats_interval_secs));
        }

        let fixed = [
            (
                "filter.interface",
                current.filter.interface != next.filter.interface,
            ),
            ("filter.policy", current.filter.policy != next.filter.policy),
            (
                "filter.xdp_mode",
                current.filter.xdp_mode != next.filter.xdp_mode,
            ),
            (
                "filter.object_path",
                current.filter.object_path != next.filter.object_path,
            ),
            (
                "filter.pin_path",
                current.filter.pin_path != next.filter.pin_path,
            ),
            (
                "general.log_level",
                current.general.log_level != next.general.log_level,
            ),
            (
                "general.log_format",
                current.general.log_format != next.general.log_format,
            ),
            (
                "metrics.enabled",
                current.metrics.enabled != next.metrics.enabled,
            ),
            (
                "metrics.listen_addr",
                current.metrics.listen_addr != next.metrics.listen_addr,
            ),
            ("metrics.port", current.metrics.port != next.metrics.port),
            (
                "metrics.endpoint",
                current.metrics.endpoint != next.metrics.endpoint,
            ),
        ];
        plan.restart_required = fixed
            .into_iter()
            .filter_map(|(field, changed)| changed.then_some(field))
            .collect();

        plan
    }

    /// Rewrite the target port when the live map disagrees with the new file.
    ///
    /// `live` is the port the kernel currently filters on, or `None` when it
    /// could not be read.
    pub fn reconcile_target_port(&mut self, next: &PortguardConfig, live: Option<u16>) {
        if live.is_some_and(|live| live != next.filter.target_port) {
            self.target_port = Some(next.filter.target_port);
        }
    }

    /// Whether the reload changes anything at runtime.
    pub fn is_noop(&self) -> bool {
        self.target_port.is_none() && self.stats_interval.is_none()
    }

    /// Fold the applied settings into the running configuration.
    pub fn apply_to(&self, config: &mut PortguardConfig) {
        if let Some(port) = self.target_port {
            config.filter.target_port = port;
        }
        if let Some(interval) = self.stats_interval {
            config.filter.stats_interval_secs = interval.as_secs();
        }
    }
}
