//! `portguard probe` command handler
//!
//! Opens a TCP connection to each port and classifies the result. A dropped
//! SYN never gets an answer, so a port behind the filter shows up as
//! `filtered` while a closed but unfiltered port is `refused`.

use std::io::{ErrorKind, Write};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::debug;

use crate::cli::ProbeArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `probe` command.
pub async fn execute(args: ProbeArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let timeout = Duration::from_millis(args.timeout_ms);
    let results = probe_ports(args.host, &args.ports, timeout).await?;

    writer.render(&ProbeReport {
        host: args.host,
        timeout_ms: args.timeout_ms,
        results,
    })
}

/// Probe all ports concurrently; results keep the order of `ports`.
pub async fn probe_ports(
    host: IpAddr,
    ports: &[u16],
    timeout: Duration,
) -> Result<Vec<ProbeResult>, CliError> {
    let mut tasks = JoinSet::new();
    for (idx, &port) in ports.iter().enumerate() {
        tasks.spawn(async move {
            let outcome = probe(SocketAddr::new(host, port), timeout).await;
            (idx, ProbeResult { port, outcome })
        });
    }

    let mut results = Vec::with_capacity(ports.len());
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| CliError::Command(format!("probe task failed: {e}")))?;
        results.push(result);
    }
    results.sort_by_key(|(idx, _)| *idx);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}

/// Try one TCP connect.
pub async fn probe(addr: SocketAddr, timeout: Duration) -> ProbeOutcome {
    let attempt = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .ok()
        .map(|connected| connected.map(drop));
    let outcome = ProbeOutcome::from_attempt(attempt);
    debug!(%addr, ?outcome, "probed");
    outcome
}

/// What a connect attempt ran into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// Handshake completed.
    Open,
    /// RST received: nothing listening, packet not dropped.
    Refused,
    /// No answer within the timeout.
    Filtered,
    /// Any other socket error.
    Error(String),
}

impl ProbeOutcome {
    /// Classify a connect attempt; `None` means it timed out.
    pub fn from_attempt(attempt: Option<std::io::Result<()>>) -> Self {
        match attempt {
            Some(Ok(())) => Self::Open,
            Some(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => Self::Refused,
            Some(Err(e)) => Self::Error(e.to_string()),
            None => Self::Filtered,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Refused => "refused",
            Self::Filtered => "filtered (timeout)",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub port: u16,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

#[derive(Serialize)]
pub struct ProbeReport {
    pub host: IpAddr,
    pub timeout_ms: u64,
    pub results: Vec<ProbeResult>,
}

impl Render for ProbeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Probe {} (timeout {} ms)", self.host, self.timeout_ms)?;
        writeln!(w, "{:<8} {}", "PORT", "STATE")?;
        for result in &self.results {
            let state = match &result.outcome {
                ProbeOutcome::Open => result.outcome.label().green(),
                ProbeOutcome::Refused => result.outcome.label().normal(),
                ProbeOutcome::Filtered => result.outcome.label().yellow(),
                ProbeOutcome::Error(detail) => format!("error: {detail}").red(),
            };
            writeln!(w, "{:<8} {}", result.port, state)?;
        }
        Ok(())
    }
}
