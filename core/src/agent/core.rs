//! Agent Core Implementation
//!
//! Drives one user turn: ask the decision service for an action, apply it,
//! feed command results back, and stop on a reply, an error or the ceiling.
use crate::agent::cognition::{
    parse_decision, CommandReport, ConversationHistory, Decision, Message, StepOutcome,
};
use crate::config::AgentConfig;
use crate::executor::{CommandExecutor, CommandResult};
use crate::llm::{ApiKey, DecisionService};
use std::sync::Arc;

pub const MISSING_CREDENTIAL: &str =
    "Error: API Key not set for Agent. Please configure it (use /api <key>).";
pub const MAX_STEPS_REACHED: &str =
    "Reached max automated steps for this request. Please provide further instructions if needed.";
pub const MALFORMED_EXHAUSTED: &str = "Reached max automated steps after AI response error. AI failed to provide a valid response. Please provide further instructions or try a different approach.";
pub const MALFORMED_FEEDBACK: &str = "SystemFeedback: Your previous response was empty or malformed. Please ensure your response strictly follows the required format, starting with ACTION: on the first line, followed by necessary fields like TEXT:, COMMAND:, or REASON: on new lines as specified in your instructions.";

/// Scratch state owned by one in-flight turn.
struct TurnState {
    iteration: usize,
    /// Durable history plus everything observed during this turn, unbounded.
    working: ConversationHistory,
    /// Messages to show, in order.
    output: Vec<Message>,
}

impl TurnState {
    /// Shown to the user and recorded in durable history.
    fn emit(&mut self, durable: &mut ConversationHistory, message: Message) {
        durable.push(message.clone());
        self.output.push(message);
    }

    /// Shown, recorded, and visible to the model for the rest of the turn.
    fn emit_observed(&mut self, durable: &mut ConversationHistory, message: Message) {
        self.working.push(message.clone());
        self.emit(durable, message);
    }

    /// Not shown, but recorded and visible to the model.
    fn observe(&mut self, durable: &mut ConversationHistory, message: Message) {
        durable.push(message.clone());
        self.working.push(message);
    }
}

/// The core Agent that manages the agentic loop.
pub struct Agent {
    decision_service: Arc<dyn DecisionService>,
    executor: Arc<dyn CommandExecutor>,
    max_iterations: usize,
    history: ConversationHistory,
}

impl Agent {
    pub fn new(
        decision_service: Arc<dyn DecisionService>,
        executor: Arc<dyn CommandExecutor>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            decision_service,
            executor,
            max_iterations: config.max_iterations.max(1),
            history: ConversationHistory::with_cap(config.history_limit),
        }
    }

    /// Durable history across turns.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        crate::info_log!("Clearing {} messages of history", self.history.len());
        self.history.clear();
    }

    /// Run one turn and return the messages to display, in order.
    ///
    /// Never fails: every outcome, including service and command failures,
    /// is represented as a message.
    pub async fn process_user_message(
        &mut self,
        text: &str,
        credential: Option<&ApiKey>,
    ) -> Vec<Message> {
        self.history.push(Message::user(text));

        let Some(credential) = credential else {
            crate::error_log!("Turn rejected: no API key configured");
            return vec![Message::error(MISSING_CREDENTIAL)];
        };

        let mut state = TurnState {
            iteration: 0,
            working: self.history.snapshot(),
            output: Vec::new(),
        };

        while state.iteration < self.max_iterations {
            state.iteration += 1;
            let decision = self.decide(&mut state, credential).await;
            crate::debug_log!(
                "Iteration {}/{}: {}",
                state.iteration,
                self.max_iterations,
                decision.label()
            );

            match self.step(&mut state, decision).await {
                StepOutcome::Continue => continue,
                StepOutcome::RetryMalformed => {
                    crate::debug_log!(
                        "Malformed reply on iteration {}, asking again with feedback",
                        state.iteration
                    );
                }
                StepOutcome::Terminate => break,
            }
        }

        crate::info_log!(
            "Turn finished after {} iteration(s), {} message(s)",
            state.iteration,
            state.output.len()
        );
        state.output
    }

    async fn decide(&self, state: &mut TurnState, credential: &ApiKey) -> Decision {
        match self
            .decision_service
            .request_action(state.working.as_slice(), credential)
            .await
        {
            Ok(raw) => parse_decision(&raw),
            Err(e) => {
                crate::error_log!("Decision service failed: {}", e);
                Decision::ServiceFailure {
                    detail: format!("Error communicating with AI: {}", e),
                }
            }
        }
    }

    /// Apply one decision to the turn.
    async fn step(&mut self, state: &mut TurnState, decision: Decision) -> StepOutcome {
        match decision {
            Decision::Speak { text } => {
                state.emit(&mut self.history, Message::agent(text));
                StepOutcome::Terminate
            }
            Decision::Error { detail } | Decision::ServiceFailure { detail } => {
                state.emit(&mut self.history, Message::error(detail));
                StepOutcome::Terminate
            }
            Decision::ExecuteCommand { command, reasoning } => {
                self.execute_step(state, command, reasoning).await
            }
            Decision::MalformedResponse { raw_text } => self.malformed_step(state, raw_text),
        }
    }

    async fn execute_step(
        &mut self,
        state: &mut TurnState,
        command: String,
        reasoning: String,
    ) -> StepOutcome {
        if !reasoning.trim().is_empty() {
            state.emit_observed(
                &mut self.history,
                Message::status(format!("Thinking: {}", reasoning)),
            );
        }
        state.emit_observed(
            &mut self.history,
            Message::command_log(format!("Executing: {}", command)),
        );

        let result = self.run_command(&command).await;
        let report = CommandReport::build(&command, &result);
        state.observe(&mut self.history, report.model);
        state.output.push(report.display);

        if state.iteration >= self.max_iterations {
            state.emit(&mut self.history, Message::status(MAX_STEPS_REACHED));
            return StepOutcome::Terminate;
        }
        StepOutcome::Continue
    }

    fn malformed_step(&mut self, state: &mut TurnState, raw_text: String) -> StepOutcome {
        state.emit_observed(
            &mut self.history,
            Message::error(format!(
                "AI response was malformed or empty. The AI will attempt to retry. Original raw response: {}",
                raw_text
            )),
        );
        state.observe(&mut self.history, Message::status(MALFORMED_FEEDBACK));

        if state.iteration >= self.max_iterations {
            state.emit(&mut self.history, Message::error(MALFORMED_EXHAUSTED));
            return StepOutcome::Terminate;
        }
        StepOutcome::RetryMalformed
    }

    /// Run on its own task so a panicking executor becomes a failed result.
    async fn run_command(&self, command: &str) -> CommandResult {
        crate::info_log!("Executing command: {}", command);
        let executor = Arc::clone(&self.executor);
        let owned = command.to_string();
        match tokio::spawn(async move { executor.run(&owned).await }).await {
            Ok(result) => {
                if result.failed {
                    crate::error_log!("Command failed: {}", command);
                }
                result
            }
            Err(e) => {
                crate::error_log!("Executor task aborted: {}", e);
                CommandResult::failure(format!(
                    "An unexpected error occurred during command execution: {}",
                    e
                ))
            }
        }
    }
}
