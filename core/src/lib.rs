pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod output;

// Re-exports for convenience
pub use agent::core::Agent;
pub use config::Config;
pub use error::{ConfigError, ServiceError};
pub use executor::{CommandExecutor, CommandResult, ShellExecutor};
pub use llm::{ApiKey, DecisionService, LlmClient};
