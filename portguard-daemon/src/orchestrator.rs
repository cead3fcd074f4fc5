//! Filter lifecycle orchestration -- configuration, engine startup, stats
//! polling, reload and shutdown.
//!
//! The [`Orchestrator`] is the central coordinator of `portguard-daemon`.
//!
//! # Run Loop
//!
//! 1. Start the filter engine (load, attach, pin maps, write target port)
//! 2. Every `filter.stats_interval_secs`, poll `STATS` and log the counters
//! 3. `SIGHUP`: reload the config file and apply the target port
//! 4. `SIGTERM` / `SIGINT`: log final stats, detach and exit

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::{Interval, MissedTickBehavior};

use portguard_core::config::PortguardConfig;
use portguard_core::error::{ConfigError, PortguardError};
use portguard_core::metrics as m;
use portguard_core::pipeline::{HealthStatus, Pipeline};
use portguard_ebpf_engine::{EngineConfig, FilterEngine, FilterStats, PolicyKind};

use crate::cli::ConfigOverrides;
use crate::metrics_server;
use crate::reload::ReloadPlan;

/// Load the configuration with full precedence: CLI > env > file > defaults.
///
/// A missing file yields defaults; any other read or parse failure is an error.
pub async fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<PortguardConfig> {
    let mut config = match PortguardConfig::from_file(path).await {
        Ok(config) => config,
        Err(PortguardError::Config(ConfigError::FileNotFound { .. })) => {
            PortguardConfig::default()
        }
        Err(e) => return Err(anyhow::anyhow!("failed to load config: {}", e)),
    };
    config.apply_env_overrides();
    overrides.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Running configuration (restart-only settings keep their startup values).
    config: PortguardConfig,
    /// Path re-read on SIGHUP.
    config_path: PathBuf,
    /// Command-line overrides re-applied on every reload.
    overrides: ConfigOverrides,
    engine: FilterEngine,
    start_time: Instant,
}

impl Orchestrator {
    /// Build from an already-loaded configuration.
    ///
    /// Installs the metrics recorder when enabled and builds (but does not
    /// start) the filter engine.
    pub fn build_from_config(
        config: PortguardConfig,
        config_path: PathBuf,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let engine = FilterEngine::builder()
            .config(EngineConfig::from_core(&config.filter))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build filter engine: {}", e))?;

        Ok(Self {
            config,
            config_path,
            overrides,
            engine,
            start_time: Instant::now(),
        })
    }

    /// Start the filter and run until a shutdown signal is received.
    pub async fn run(&mut self) -> Result<()> {
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;
        let mut sighup = signal(SignalKind::hangup())
            .map_err(|e| anyhow::anyhow!("failed to install SIGHUP handler: {}", e))?;

        self.engine
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start filter engine: {}", e))?;

        match self.engine.health_check().await {
            HealthStatus::Healthy => {}
            status => tracing::warn!(status = %status, "filter engine running degraded"),
        }

        if self.engine.policy() == PolicyKind::Process {
            tracing::info!("process policy does not record statistics");
        }

        let mut stats_tick = stats_interval(self.engine.config().stats_interval());

        tracing::info!("entering main loop");
        let received = loop {
            tokio::select! {
                _ = stats_tick.tick() => self.poll_stats(),
                _ = sighup.recv() => {
                    if let Some(interval) = self.reload().await {
                        stats_tick = stats_interval(interval);
                    }
                }
                _ = sigterm.recv() => break "SIGTERM",
                _ = sigint.recv() => break "SIGINT",
            }
        };
        tracing::info!(signal = received, "shutdown signal received");

        self.shutdown().await
    }

    /// Read the counters and log them.
    fn poll_stats(&mut self) {
        if self.engine.policy() != PolicyKind::Port {
            return;
        }
        match self.engine.poll_stats() {
            Ok(stats) => log_stats("filter stats", stats),
            Err(e) => tracing::warn!(error = %e, "failed to read filter stats"),
        }
    }

    /// Re-read the config file and apply what can change at runtime.
    ///
    /// Failures are logged and the running configuration is kept.
    /// Returns the new polling interval when it changed.
    async fn reload(&mut self) -> Option<Duration> {
        tracing::info!(path = %self.config_path.display(), "reloading configuration");

        let next = match load_config(&self.config_path, &self.overrides).await {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(error = %e, "reload failed, keeping running configuration");
                return None;
            }
        };

        let mut plan = ReloadPlan::diff(&self.config, &next);
        if self.engine.policy() == PolicyKind::Port {
            match self
                .engine
                .control()
                .and_then(|maps| maps.effective_target_port())
            {
                Ok(live) => plan.reconcile_target_port(&next, Some(live)),
                Err(e) => tracing::warn!(error = %e, "failed to read live target port"),
            }
        }
        for field in &plan.restart_required {
            tracing::warn!(field, "setting changed but requires a restart; ignoring");
        }

        if let Some(port) = plan.target_port {
            if let Err(e) = self.engine.set_target_port(port) {
                tracing::error!(error = %e, port, "failed to update target port");
                return None;
            }
        }

        plan.apply_to(&mut self.config);
        metrics::counter!(m::CONFIG_RELOADS_TOTAL).increment(1);
        tracing::info!(
            target_port = self.config.filter.target_port,
            changed = !plan.is_noop(),
            "configuration reloaded"
        );

        plan.stats_interval
    }

    /// Log final counters and detach the program.
    async fn shutdown(&mut self) -> Result<()> {
        if self.engine.policy() == PolicyKind::Port {
            match self.engine.poll_stats() {
                Ok(stats) => log_stats("final filter stats", stats),
                Err(e) => tracing::warn!(error = %e, "failed to read final filter stats"),
            }
        }

        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "stopping filter engine"
        );
        self.engine
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop filter engine: {}", e))
    }

    /// Get a reference to the running configuration.
    pub fn config(&self) -> &PortguardConfig {
        &self.config
    }

    /// Current engine health.
    pub async fn health(&self) -> HealthStatus {
        self.engine.health_check().await
    }
}

/// Interval whose first tick fires one period from now.
fn stats_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn log_stats(message: &'static str, stats: &FilterStats) {
    tracing::info!(
        total = stats.total,
        dropped = stats.dropped,
        passed = stats.passed,
        drop_ratio = stats.drop_ratio,
        pps = stats.pps,
        drops_per_sec = stats.drops_per_sec,
        "{}",
        message
    );
}
