//! `aicmd` - turn plain-language requests into shell commands
//!
//! An AI agent picks a command, runs it, reads the result and repeats until
//! it can answer. Use it as a one-shot command or as an interactive chat.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{Cli, Commands, ConfigCommand};
use crate::terminal::ChatSession;
use aicmd_core::config::{find_config_file, get_config_dir};
use aicmd_core::llm::system_prompt;
use aicmd_core::output::OutputFormatter;
use aicmd_core::{Agent, Config, LlmClient, ShellExecutor};

mod cli;
mod terminal;

/// Main entry point for the CLI
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(dir) = get_config_dir() {
        aicmd_core::agent::logger::init(&dir);
    }

    let formatter = OutputFormatter::new();

    let config_path = cli.config.clone().or_else(find_config_file);
    let config = Config::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;
    // Where /api and `config init` write to
    let save_path = config_path.or_else(Config::default_path);

    match &cli.command {
        Some(Commands::Config { cmd }) => {
            handle_config(cmd.as_ref(), &cli, &config, save_path, &formatter)?;
        }

        Some(Commands::Query { query }) => {
            let session = build_session(&cli, config, save_path)?;
            session.run_turn(&query.join(" ")).await;
        }

        None if !cli.query.is_empty() => {
            let session = build_session(&cli, config, save_path)?;
            session.run_turn(&cli.query.join(" ")).await;
        }

        Some(Commands::Chat) | None => {
            let session = build_session(&cli, config, save_path)?;
            session.run().await?;
        }
    }

    Ok(())
}

fn build_session(cli: &Cli, config: Config, save_path: Option<PathBuf>) -> Result<ChatSession> {
    let api_key = config.resolve_api_key(cli.api_key.as_deref());
    let agent = build_agent(&config)?;
    Ok(ChatSession::new(agent, config, save_path, api_key))
}

/// Wire the decision service and the shell executor into an agent
fn build_agent(config: &Config) -> Result<Agent> {
    let client = LlmClient::new(config.llm.clone())
        .context("Failed to create LLM client")?
        .with_system_prompt(system_prompt(config.executor.shell));
    let executor = ShellExecutor::new(&config.executor);

    aicmd_core::info_log!(
        "Agent ready: provider={} model={} shell={}",
        config.llm.provider,
        config.llm.model(),
        config.executor.shell
    );

    Ok(Agent::new(Arc::new(client), Arc::new(executor), &config.agent))
}

fn handle_config(
    cmd: Option<&ConfigCommand>,
    cli: &Cli,
    config: &Config,
    save_path: Option<PathBuf>,
    formatter: &OutputFormatter,
) -> Result<()> {
    match cmd.unwrap_or(&ConfigCommand::Show) {
        ConfigCommand::Show => {
            let key_configured = config.resolve_api_key(cli.api_key.as_deref()).is_some();
            formatter.print_config(config, key_configured);
        }
        ConfigCommand::Path => {
            let path = save_path.context("Could not determine a configuration path")?;
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = save_path.context("Could not determine a configuration path")?;
            if path.exists() && !force {
                formatter.print_info(&format!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                ));
                return Ok(());
            }
            Config::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            formatter.print_info(&format!("Wrote default configuration to {}", path.display()));
        }
    }
    Ok(())
}
