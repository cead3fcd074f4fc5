use clap::Parser;
use tracing_subscriber::EnvFilter;

use portguard_cli::cli::{Cli, Commands};
use portguard_cli::commands;
use portguard_cli::error::CliError;
use portguard_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable with --output json.
    let level = cli.log_level.as_deref().unwrap_or("warn");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Stats(args) => commands::stats::execute(args, config_path, &writer).await,
        Commands::Port(args) => commands::port::execute(args, config_path, &writer).await,
        Commands::Probe(args) => commands::probe::execute(args, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}
