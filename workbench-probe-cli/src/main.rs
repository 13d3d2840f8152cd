//! workbench-probe -- notebook workbench pod verification CLI
//!
//! Loads `workbench-probe.toml`, installs the tracing subscriber once,
//! dispatches to a subcommand handler and maps its error to an exit code.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;
use tracing::Instrument;
use uuid::Uuid;

use workbench_probe_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let loaded = commands::load_config(&cli.config).await;

    // `config validate` must be able to report a broken file, so logging
    // falls back to defaults when loading fails.
    let general = match &loaded {
        Ok(config) => config.general.clone(),
        Err(_) => GeneralConfig::default(),
    };
    logging::init_tracing(&general, cli.log_level.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;

    tracing::debug!(config = %cli.config.display(), "workbench-probe starting");

    let writer = OutputWriter::new(cli.output);
    // 한 번의 실행에서 나온 로그를 묶기 위한 ID
    let span = tracing::info_span!("run", run_id = %Uuid::new_v4());

    async move {
        match cli.command {
            Commands::Config(args) => {
                commands::config::execute(args, &cli.config, &writer).await
            }
            Commands::Verify(args) => commands::verify::execute(args, &loaded?, &writer).await,
            Commands::Wait(args) => commands::wait::execute(args, &loaded?, &writer).await,
            Commands::Check(args) => commands::check::execute(args, &loaded?, &writer).await,
            Commands::Resources(args) => {
                commands::resources::execute(args, &loaded?, &writer).await
            }
        }
    }
    .instrument(span)
    .await
}
