//! Integration Tests for the agent loop
//!
//! Drive whole turns against a scripted decision service and a recording
//! executor. No network, no shell.

#[cfg(test)]
mod tests {
    use crate::agent::cognition::{Message, MessageKind, Sender};
    use crate::agent::core::{
        Agent, MALFORMED_EXHAUSTED, MALFORMED_FEEDBACK, MAX_STEPS_REACHED, MISSING_CREDENTIAL,
    };
    use crate::config::AgentConfig;
    use crate::error::ServiceError;
    use crate::executor::{CommandExecutor, CommandResult};
    use crate::llm::{ApiKey, DecisionService};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    enum Reply {
        Text(&'static str),
        Fail,
    }

    /// Decision service that plays back a script, then repeats a fallback.
    struct ScriptedService {
        script: Mutex<VecDeque<Reply>>,
        fallback: &'static str,
        calls: Mutex<usize>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedService {
        fn new(script: Vec<Reply>, fallback: &'static str) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn repeating(reply: &'static str) -> Arc<Self> {
            Self::new(Vec::new(), reply)
        }

        fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl DecisionService for ScriptedService {
        async fn request_action(
            &self,
            history: &[Message],
            _credential: &ApiKey,
        ) -> Result<String, ServiceError> {
            *self.calls.lock() += 1;
            self.seen.lock().push(history.to_vec());
            match self.script.lock().pop_front() {
                Some(Reply::Text(text)) => Ok(text.to_string()),
                Some(Reply::Fail) => Err(ServiceError::Network {
                    provider: "mock".into(),
                    message: "connection refused".into(),
                }),
                None => Ok(self.fallback.to_string()),
            }
        }
    }

    /// Executor that records commands and answers with a fixed result.
    struct RecordingExecutor {
        result: CommandResult,
        commands: Mutex<Vec<String>>,
    }

    impl RecordingExecutor {
        fn ok(stdout: &str) -> Arc<Self> {
            Arc::new(Self {
                result: CommandResult {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    failed: false,
                },
                commands: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandExecutor for RecordingExecutor {
        async fn run(&self, command: &str) -> CommandResult {
            self.commands.lock().push(command.to_string());
            self.result.clone()
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl CommandExecutor for PanickingExecutor {
        async fn run(&self, _command: &str) -> CommandResult {
            panic!("shell exploded");
        }
    }

    fn agent(
        service: Arc<dyn DecisionService>,
        executor: Arc<dyn CommandExecutor>,
        max_iterations: usize,
        history_limit: usize,
    ) -> Agent {
        Agent::new(
            service,
            executor,
            &AgentConfig {
                max_iterations,
                history_limit,
            },
        )
    }

    fn key() -> ApiKey {
        ApiKey::parse("test-key").unwrap()
    }

    const EXECUTE: &str = "ACTION: execute_powershell\nCOMMAND: Get-Date\nREASON: check the time";

    #[tokio::test]
    async fn test_speak_ends_turn() {
        let service = ScriptedService::repeating("ACTION: speak\nTEXT: Hello there");
        let executor = RecordingExecutor::ok("");
        let mut agent = agent(service.clone(), executor.clone(), 15, 20);

        let output = agent.process_user_message("hi", Some(&key())).await;

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].text(), "Hello there");
        assert_eq!(output[0].kind(), MessageKind::NormalText);
        assert_eq!(output[0].sender(), Sender::Agent);
        assert_eq!(service.calls(), 1);
        assert!(executor.commands.lock().is_empty());
        assert_eq!(agent.history().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let service = ScriptedService::repeating("ACTION: speak\nTEXT: unreachable");
        let mut agent = agent(service.clone(), RecordingExecutor::ok(""), 15, 20);

        let output = agent.process_user_message("list files", None).await;

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].text(), MISSING_CREDENTIAL);
        assert_eq!(output[0].kind(), MessageKind::ErrorText);
        assert_eq!(service.calls(), 0);
        // Only the user message was recorded
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history().last().unwrap().text(), "list files");
    }

    #[tokio::test]
    async fn test_execute_then_speak() {
        let service = ScriptedService::new(
            vec![Reply::Text(EXECUTE)],
            "ACTION: speak\nTEXT: It is noon.",
        );
        let executor = RecordingExecutor::ok("12:00");
        let mut agent = agent(service.clone(), executor.clone(), 15, 50);

        let output = agent.process_user_message("what time is it?", Some(&key())).await;

        let texts: Vec<_> = output.iter().map(|m| m.text().to_string()).collect();
        assert_eq!(
            texts,
            vec![
                "Thinking: check the time".to_string(),
                "Executing: Get-Date".to_string(),
                "Output for 'Get-Date':\n12:00".to_string(),
                "It is noon.".to_string(),
            ]
        );
        assert_eq!(*executor.commands.lock(), vec!["Get-Date".to_string()]);

        // The second request sees the model rendering, not the display one
        let seen = service.seen.lock();
        assert_eq!(seen.len(), 2);
        let second: Vec<_> = seen[1].iter().map(|m| m.text().to_string()).collect();
        assert_eq!(second[0], "what time is it?");
        assert_eq!(second[1], "Thinking: check the time");
        assert_eq!(second[2], "Executing: Get-Date");
        assert!(second[3].starts_with("SystemExecutionResult: Execution of 'Get-Date' SUCCEEDED"));
        assert!(!second.iter().any(|t| t.starts_with("Output for")));
    }

    #[tokio::test]
    async fn test_execute_until_ceiling() {
        let service = ScriptedService::repeating(EXECUTE);
        let executor = RecordingExecutor::ok("tick");
        let mut agent = agent(service.clone(), executor.clone(), 4, 100);

        let output = agent.process_user_message("loop forever", Some(&key())).await;

        assert_eq!(service.calls(), 4);
        assert_eq!(executor.commands.lock().len(), 4);
        let last = output.last().unwrap();
        assert_eq!(last.text(), MAX_STEPS_REACHED);
        assert_eq!(last.kind(), MessageKind::StatusNote);
        assert_eq!(
            output.iter().filter(|m| m.text() == MAX_STEPS_REACHED).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_malformed_until_ceiling() {
        let service = ScriptedService::repeating("   ");
        let mut agent = agent(service.clone(), RecordingExecutor::ok(""), 3, 100);

        let output = agent.process_user_message("hello?", Some(&key())).await;

        assert_eq!(service.calls(), 3);
        let last = output.last().unwrap();
        assert_eq!(last.text(), MALFORMED_EXHAUSTED);
        assert_eq!(last.kind(), MessageKind::ErrorText);
        assert!(!output.iter().any(|m| m.text() == MAX_STEPS_REACHED));
        // Corrective feedback goes to the model only
        assert!(!output.iter().any(|m| m.text() == MALFORMED_FEEDBACK));
        assert_eq!(
            output
                .iter()
                .filter(|m| m.text().starts_with("AI response was malformed"))
                .count(),
            3
        );

        let seen = service.seen.lock();
        assert_eq!(seen[1].last().unwrap().text(), MALFORMED_FEEDBACK);
    }

    #[tokio::test]
    async fn test_malformed_then_recovers() {
        let service = ScriptedService::new(vec![Reply::Text("")], "ACTION: speak\nTEXT: sorry");
        let mut agent = agent(service.clone(), RecordingExecutor::ok(""), 15, 100);

        let output = agent.process_user_message("hi", Some(&key())).await;

        assert_eq!(service.calls(), 2);
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].kind(), MessageKind::ErrorText);
        assert_eq!(output[1].text(), "sorry");
    }

    #[tokio::test]
    async fn test_service_failure_not_retried() {
        let service = ScriptedService::new(vec![Reply::Fail], "ACTION: speak\nTEXT: unreachable");
        let mut agent = agent(service.clone(), RecordingExecutor::ok(""), 15, 20);

        let output = agent.process_user_message("hi", Some(&key())).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].kind(), MessageKind::ErrorText);
        assert!(output[0].text().contains("connection refused"));
        assert_eq!(agent.history().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_command_is_terminal() {
        let service = ScriptedService::repeating("ACTION: execute_powershell\nREASON: oops");
        let executor = RecordingExecutor::ok("");
        let mut agent = agent(service.clone(), executor.clone(), 15, 20);

        let output = agent.process_user_message("do it", Some(&key())).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(output.len(), 1);
        assert!(output[0].text().contains("missing"));
        assert!(executor.commands.lock().is_empty());
    }

    #[tokio::test]
    async fn test_execute_without_reasoning_has_no_thinking_note() {
        let service = ScriptedService::new(
            vec![Reply::Text("ACTION: execute_powershell\nCOMMAND: Get-Date")],
            "ACTION: speak\nTEXT: done",
        );
        let executor = RecordingExecutor::ok("12:00");
        let mut agent = agent(service.clone(), executor.clone(), 15, 50);

        let output = agent.process_user_message("time", Some(&key())).await;

        assert_eq!(*executor.commands.lock(), vec!["Get-Date".to_string()]);
        assert_eq!(output[0].text(), "Executing: Get-Date");
        assert!(!output.iter().any(|m| m.text().starts_with("Thinking:")));
        assert!(!output.iter().any(|m| m.kind() == MessageKind::StatusNote));

        let seen = service.seen.lock();
        assert!(!seen[1].iter().any(|m| m.text().starts_with("Thinking:")));
        assert_eq!(seen[1][1].text(), "Executing: Get-Date");
    }

    #[tokio::test]
    async fn test_explicit_error_ends_turn() {
        let service = ScriptedService::repeating("ACTION: error\nTEXT: That request is ambiguous.");
        let executor = RecordingExecutor::ok("");
        let mut agent = agent(service.clone(), executor.clone(), 15, 20);

        let output = agent.process_user_message("do the thing", Some(&key())).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].kind(), MessageKind::ErrorText);
        assert_eq!(output[0].text(), "That request is ambiguous.");
        assert!(executor.commands.lock().is_empty());

        assert_eq!(agent.history().len(), 2);
        assert_eq!(
            agent.history().last().unwrap().text(),
            "That request is ambiguous."
        );
    }

    #[tokio::test]
    async fn test_unknown_action_ends_turn() {
        let service = ScriptedService::repeating("ACTION: dance\nTEXT: wheee");
        let executor = RecordingExecutor::ok("");
        let mut agent = agent(service.clone(), executor.clone(), 15, 20);

        let output = agent.process_user_message("hi", Some(&key())).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].kind(), MessageKind::ErrorText);
        assert!(output[0].text().contains("('dance')"));
        assert!(executor.commands.lock().is_empty());

        assert_eq!(agent.history().len(), 2);
        assert_eq!(agent.history().last().unwrap().text(), output[0].text());
    }

    #[tokio::test]
    async fn test_empty_action_ends_turn_without_retry() {
        let service = ScriptedService::repeating("ACTION:\nTEXT: hi");
        let mut agent = agent(service.clone(), RecordingExecutor::ok(""), 15, 20);

        let output = agent.process_user_message("hi", Some(&key())).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].kind(), MessageKind::ErrorText);
        assert!(output[0].text().contains("unspecified action type"));
        assert!(!agent
            .history()
            .last()
            .unwrap()
            .text()
            .starts_with("SystemFeedback"));
    }

    #[tokio::test]
    async fn test_executor_panic_becomes_failed_result() {
        let service = ScriptedService::new(vec![Reply::Text(EXECUTE)], "ACTION: speak\nTEXT: done");
        let mut agent = agent(service.clone(), Arc::new(PanickingExecutor), 15, 50);

        let output = agent.process_user_message("time", Some(&key())).await;

        assert_eq!(output.last().unwrap().text(), "done");
        assert!(output
            .iter()
            .any(|m| m.text().starts_with("Execution of 'Get-Date' FAILED.")));
        let seen = service.seen.lock();
        assert!(seen[1]
            .last()
            .unwrap()
            .text()
            .contains("FAILED"));
    }

    #[tokio::test]
    async fn test_durable_history_capped_across_turns() {
        let service = ScriptedService::repeating(EXECUTE);
        let mut agent = agent(service.clone(), RecordingExecutor::ok("x"), 3, 5);

        agent.process_user_message("first", Some(&key())).await;
        assert_eq!(agent.history().len(), 5);
        agent.process_user_message("second", Some(&key())).await;
        assert_eq!(agent.history().len(), 5);
        assert_eq!(agent.history().last().unwrap().text(), MAX_STEPS_REACHED);

        // Working history grows past the cap within a turn
        let seen = service.seen.lock();
        assert!(seen.last().unwrap().len() > 5);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let service = ScriptedService::repeating("ACTION: speak\nTEXT: ok");
        let mut agent = agent(service.clone(), RecordingExecutor::ok(""), 15, 20);

        agent.process_user_message("one", Some(&key())).await;
        agent.clear_history();
        assert!(agent.history().is_empty());

        agent.process_user_message("two", Some(&key())).await;
        let seen = service.seen.lock();
        assert_eq!(seen.last().unwrap().len(), 1);
        assert_eq!(seen.last().unwrap()[0].text(), "two");
    }
}
