use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod commands;
mod json;
mod server;
mod sign;
mod util;

fn init_tracing(cli: &cli::Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if matches!(cli.command, cli::Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// A missing `.env` file is fine; one that exists but fails to load is not.
fn dotenv_problem<T>(result: dotenvy::Result<T>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    init_tracing(&cli);

    if let Some(e) = dotenv_problem(dotenv) {
        tracing::warn!(error = %e, "Ignoring unreadable .env file");
    }

    match app::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
