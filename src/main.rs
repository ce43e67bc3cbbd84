use anyhow::Result;
use clap::Parser;

use mn_immunization::cli::Cli;
use mn_immunization::config::Config;
use mn_immunization::orchestrator::App;
use mn_immunization::utils::logging::{init_logging, log_startup};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_file = init_logging(&cli.log_level, config.paths.logs_folder.as_deref())?;
    log_startup(cli.command.label());
    if let Some(path) = log_file {
        tracing::info!("Logging to {}", path.display());
    }

    // Run the command
    if let Err(e) = App::new(config).run(&cli.command).await {
        tracing::error!("❌ {:#}", e);
        return Err(e);
    }

    Ok(())
}
