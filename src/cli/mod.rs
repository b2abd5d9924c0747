//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Turn plain-language requests into shell commands
///
/// An AI agent plans commands, runs them, reads the output and keeps going
/// until it can answer. Works with Google Gemini and OpenAI-compatible
/// endpoints (Ollama, LM Studio, local models).
#[derive(Parser, Debug)]
#[command(name = "aicmd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Direct query (alternative to 'query' subcommand)
    #[arg(num_args = 1..)]
    pub query: Vec<String>,

    /// Configuration file (defaults to ./aicmd.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API key for this run (overrides environment and config file)
    #[arg(long, global = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Run a single request and exit
    Query {
        /// The request for the agent
        #[arg(num_args = 1.., required = true)]
        query: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommand>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the active configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_words_are_a_query() {
        let cli = Cli::try_parse_from(["aicmd", "list", "my", "files"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.query.join(" "), "list my files");
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::try_parse_from(["aicmd", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                cmd: Some(ConfigCommand::Init { force: true })
            })
        ));

        let cli = Cli::try_parse_from(["aicmd", "query", "disk", "usage"]).unwrap();
        match cli.command {
            Some(Commands::Query { query }) => assert_eq!(query, vec!["disk", "usage"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["aicmd", "chat", "--config", "/tmp/a.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
    }
}
