//! Cognition layer - pure, synchronous pieces of the agent
//!
//! No async, no IO. Everything here can be tested without a model or a shell.

pub mod decision;
pub mod history;
pub mod parser;
pub mod report;

pub use decision::{Decision, StepOutcome};
pub use history::{ConversationHistory, Message, MessageKind, Sender};
pub use parser::{parse_decision, NO_CONTENT};
pub use report::CommandReport;
