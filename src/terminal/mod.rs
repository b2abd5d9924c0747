//! Interactive chat session
//!
//! Reads lines from stdin, runs each one as an agent turn and prints the
//! resulting messages. Lines starting with `/` are session commands.

use aicmd_core::agent::logger::get_recent_logs;
use aicmd_core::llm::ApiKey;
use aicmd_core::output::OutputFormatter;
use aicmd_core::{Agent, Config};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

const RECENT_LOG_LINES: usize = 40;

const HELP: &str = "Commands:
  /api <key>   set the API key (empty clears it); saved to the config file
  /clear       forget the conversation so far
  /logs        show recent debug log entries
  /help        show this help
  /exit        leave the session";

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Api(String),
    Clear,
    Logs,
    Help,
    Exit,
    Unknown(String),
    Turn(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return ReplCommand::Turn(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name.to_lowercase().as_str() {
            "api" => ReplCommand::Api(arg.to_string()),
            "clear" => ReplCommand::Clear,
            "logs" => ReplCommand::Logs,
            "help" => ReplCommand::Help,
            "exit" | "quit" => ReplCommand::Exit,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

/// One agent plus the credential and config it runs with
pub struct ChatSession {
    agent: Arc<Mutex<Agent>>,
    config: Config,
    config_path: Option<PathBuf>,
    api_key: Option<ApiKey>,
    formatter: OutputFormatter,
}

impl ChatSession {
    pub fn new(
        agent: Agent,
        config: Config,
        config_path: Option<PathBuf>,
        api_key: Option<ApiKey>,
    ) -> Self {
        Self {
            agent: Arc::new(Mutex::new(agent)),
            config,
            config_path,
            api_key,
            formatter: OutputFormatter::new(),
        }
    }

    /// Run one turn and print its messages.
    ///
    /// The turn runs on its own task; a fault there is reported and the
    /// session stays usable.
    pub async fn run_turn(&self, text: &str) {
        let agent = Arc::clone(&self.agent);
        let text = text.to_string();
        let key = self.api_key.clone();

        let turn = tokio::spawn(async move {
            let mut agent = agent.lock().await;
            agent.process_user_message(&text, key.as_ref()).await
        });

        match turn.await {
            Ok(messages) => self.formatter.print_messages(&messages),
            Err(e) => {
                aicmd_core::error_log!("Turn task failed: {}", e);
                self.formatter.print_critical(&e);
            }
        }
    }

    /// Interactive loop until `/exit`, end of input or Ctrl-C
    pub async fn run(mut self) -> Result<()> {
        self.formatter.print_info(&format!(
            "aicmd {} - {} ({}). Type /help for commands.",
            env!("CARGO_PKG_VERSION"),
            self.config.llm.provider,
            self.config.llm.model()
        ));
        if self.api_key.is_none() {
            self.formatter
                .print_info("No API key configured. Use /api <key> to set one.");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read input")?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!();
                break;
            };

            match ReplCommand::parse(&line) {
                ReplCommand::Empty => {}
                ReplCommand::Exit => break,
                ReplCommand::Help => println!("{}", HELP),
                ReplCommand::Clear => {
                    self.agent.lock().await.clear_history();
                    self.formatter.print_info("Conversation cleared.");
                }
                ReplCommand::Logs => self.formatter.print_logs(&get_recent_logs(RECENT_LOG_LINES)),
                ReplCommand::Api(key) => self.set_api_key(&key),
                ReplCommand::Unknown(name) => self
                    .formatter
                    .print_info(&format!("Unknown command '/{}'. Type /help.", name)),
                ReplCommand::Turn(text) => self.run_turn(&text).await,
            }
        }
        Ok(())
    }

    fn set_api_key(&mut self, key: &str) {
        self.api_key = self.config.set_api_key(key);
        let status = if self.api_key.is_some() {
            "API key set."
        } else {
            "API key cleared."
        };

        match &self.config_path {
            Some(path) => match self.config.save(path) {
                Ok(()) => self
                    .formatter
                    .print_info(&format!("{} Saved to {}", status, path.display())),
                Err(e) => {
                    aicmd_core::error_log!("Failed to save API key: {}", e);
                    self.formatter.print_critical(&format!(
                        "{} (not saved: {})",
                        status, e
                    ));
                }
            },
            None => self.formatter.print_info(status),
        }
    }
}
