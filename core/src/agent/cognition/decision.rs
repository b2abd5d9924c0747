//! Agent decisions
//!
//! INTENT only. No execution. A decision is produced fresh each iteration
//! and only its rendering as messages is ever kept.

/// The interpreted next step chosen by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Reply to the user; ends the turn.
    Speak { text: String },
    /// Run a command and report the result back to the model.
    ExecuteCommand { command: String, reasoning: String },
    /// The model reported an error, or chose an action it did not complete.
    Error { detail: String },
    /// The reply was empty or unusable; the turn may retry.
    MalformedResponse { raw_text: String },
    /// The decision service itself failed (transport, auth, API).
    ServiceFailure { detail: String },
}

impl Decision {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Speak { .. } => "speak",
            Decision::ExecuteCommand { .. } => "execute_command",
            Decision::Error { .. } => "error",
            Decision::MalformedResponse { .. } => "malformed_response",
            Decision::ServiceFailure { .. } => "service_failure",
        }
    }
}

/// Result of applying one decision within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Ask the model for the next action.
    Continue,
    /// The previous reply was unusable; ask again with corrective feedback.
    RetryMalformed,
    /// The turn is over.
    Terminate,
}
