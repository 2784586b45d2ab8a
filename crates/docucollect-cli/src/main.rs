//! DocuCollect CLI - keep personal documents and notes in one place
//!
//! Every page of the app has a subcommand group; the bare command shows the
//! landing text or a workspace summary.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::documents::run_docs;
use crate::commands::home::run_home;
use crate::commands::notes::run_notes;
use crate::commands::profile::run_profile;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "docucollect=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_LOG_FILTER.parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Config { command }) => run_config(command, profile)?,
        Some(Commands::Auth { command }) => run_auth(command, profile).await?,
        Some(Commands::Docs { command }) => run_docs(command, profile).await?,
        Some(Commands::Notes { command }) => run_notes(command, profile).await?,
        Some(Commands::Profile { command }) => run_profile(command, profile).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => run_home(profile).await?,
    }

    Ok(())
}
