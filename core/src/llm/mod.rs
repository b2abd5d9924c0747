//! Decision service module
//!
//! The agent asks a language model for its next action through the
//! [`DecisionService`] trait. [`LlmClient`] implements it for:
//! - Google Generative AI (Gemini)
//! - OpenAI-compatible API (OpenAI, Ollama, LM Studio, local models)

pub mod client;
pub mod prompt;

pub use client::LlmClient;
pub use prompt::system_prompt;

use crate::agent::cognition::Message;
use crate::error::ServiceError;
use async_trait::async_trait;

/// Credential for the decision service.
///
/// Passed explicitly into every turn. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trimmed key, or `None` when blank or the literal `none`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(****)")
    }
}

/// Conversation role as seen by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// The agent's own replies are assistant turns. User input and
    /// everything the agent observed (command output, notes, errors) are
    /// presented to the model as user turns.
    pub fn of(message: &Message) -> Self {
        if message.is_agent_reply() {
            ChatRole::Assistant
        } else {
            ChatRole::User
        }
    }
}

/// Source of the agent's next action.
#[async_trait]
pub trait DecisionService: Send + Sync {
    /// Send the conversation so far and return the model's raw reply text.
    ///
    /// An empty reply is `Ok(String::new())`; the parser decides what it
    /// means. Transport, authentication and API failures are errors.
    async fn request_action(
        &self,
        history: &[Message],
        credential: &ApiKey,
    ) -> Result<String, ServiceError>;
}
