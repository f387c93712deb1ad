use clap::Parser;
use colored::Colorize;
use labdesk_cli::{App, Cli, FileSessionStore, Reported};
use logger_redacted::{init_logging, LoggerConfig};
use std::process::ExitCode;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LoggerConfig::from_env(cli.verbose)) {
        eprintln!("{} {e}", "Failed to initialize logging:".red());
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<Reported>() => {
            debug!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = api_client::ClientConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    debug!(base_url = %config.base_url(), version = env!("CARGO_PKG_VERSION"), "Starting labdesk");

    let store = match cli.session_file {
        Some(path) => FileSessionStore::at(path),
        None => FileSessionStore::default_location()?,
    };

    App::new(config, store)?.run(cli.command).await
}
