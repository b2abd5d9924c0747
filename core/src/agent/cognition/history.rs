//! Message history types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Agent,
}

/// How a message should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    NormalText,
    CommandLog,
    ErrorText,
    StatusNote,
}

/// Single immutable entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    text: String,
    sender: Sender,
    kind: MessageKind,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            sender,
            kind,
            timestamp: Local::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User, MessageKind::NormalText)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Agent, MessageKind::NormalText)
    }

    pub fn command_log(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Agent, MessageKind::CommandLog)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Agent, MessageKind::ErrorText)
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Agent, MessageKind::StatusNote)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// True for the agent's own conversational replies, as opposed to
    /// observations (command output, status notes, errors) it produced.
    pub fn is_agent_reply(&self) -> bool {
        self.sender == Sender::Agent && self.kind == MessageKind::NormalText
    }
}

/// Append-only message list with an optional length cap.
///
/// When capped, the oldest entries are evicted right after each append so
/// `len() <= cap` always holds.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    cap: Option<usize>,
}

impl ConversationHistory {
    /// History that keeps at most `cap` messages.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(cap.min(256)),
            cap: Some(cap),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
        if let Some(cap) = self.cap {
            while self.messages.len() > cap {
                self.messages.pop_front();
            }
        }
    }

    /// Unbounded copy of the current contents.
    pub fn snapshot(&self) -> ConversationHistory {
        ConversationHistory {
            messages: self.messages.clone(),
            cap: None,
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// Contiguous view in chronological order.
    pub fn as_slice(&mut self) -> &[Message] {
        self.messages.make_contiguous()
    }
}
