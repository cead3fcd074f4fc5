use anyhow::Result;
use clap::Parser;

use portguard_daemon::cli::DaemonCli;
use portguard_daemon::logging;
use portguard_daemon::orchestrator::{Orchestrator, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let overrides = cli.overrides();

    let config = load_config(&cli.config, &overrides).await?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        cli_overrides = !overrides.is_empty(),
        "portguard-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config, cli.config, overrides)?;
    orchestrator.run().await?;

    tracing::info!("portguard-daemon shut down");
    Ok(())
}
