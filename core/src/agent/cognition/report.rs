//! Command reports
//!
//! One executed command is one logical event with two renderings: a verbose
//! one for the person watching, and a labelled, trimmed one the model reads
//! back on the next iteration. Both are derived here from the same result so
//! they cannot drift apart.

use super::history::Message;
use crate::executor::CommandResult;

/// Prefix the system prompt tells the model to look for.
pub const EXECUTION_RESULT_PREFIX: &str = "SystemExecutionResult:";

#[derive(Debug, Clone)]
pub struct CommandReport {
    pub display: Message,
    pub model: Message,
}

impl CommandReport {
    /// Pure function of `(command, result)`; only the timestamps differ
    /// between two calls with the same input.
    pub fn build(command: &str, result: &CommandResult) -> Self {
        if result.failed {
            Self::failure(command, result)
        } else {
            Self::success(command, result)
        }
    }

    fn failure(command: &str, result: &CommandResult) -> Self {
        let display = format!(
            "Execution of '{}' FAILED.\nStandard Output:\n{}\nErrors:\n{}",
            command, result.stdout, result.stderr
        );
        let model = format!(
            "{} Execution of '{}' FAILED. Standard Output was: \"{}\". Error Output was: \"{}\".",
            EXECUTION_RESULT_PREFIX,
            command,
            result.stdout.trim(),
            result.stderr.trim()
        );
        Self {
            display: Message::error(display),
            model: Message::error(model),
        }
    }

    fn success(command: &str, result: &CommandResult) -> Self {
        let mut display = if result.stdout.trim().is_empty() {
            format!("Command '{}' executed successfully with no output.", command)
        } else {
            format!("Output for '{}':\n{}", command, result.stdout)
        };
        let mut model = format!(
            "{} Execution of '{}' SUCCEEDED. Output: \"{}\"",
            EXECUTION_RESULT_PREFIX,
            command,
            result.stdout.trim()
        );

        // Warnings on a successful run still matter to the model
        let stderr = result.stderr.trim();
        if !stderr.is_empty() {
            display.push_str(&format!("\nWarnings:\n{}", result.stderr));
            model.push_str(&format!(". Error Output was: \"{}\"", stderr));
        }

        Self {
            display: Message::command_log(display),
            model: Message::command_log(model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::cognition::history::MessageKind;

    fn result(stdout: &str, stderr: &str, failed: bool) -> CommandResult {
        CommandResult {
            stdout: stdout.into(),
            stderr: stderr.into(),
            failed,
        }
    }

    #[test]
    fn test_success_with_output() {
        let report = CommandReport::build("Get-Date", &result("Monday\n", "", false));
        assert_eq!(report.display.text(), "Output for 'Get-Date':\nMonday\n");
        assert_eq!(report.display.kind(), MessageKind::CommandLog);
        assert_eq!(
            report.model.text(),
            "SystemExecutionResult: Execution of 'Get-Date' SUCCEEDED. Output: \"Monday\""
        );
        assert_eq!(report.model.kind(), MessageKind::CommandLog);
    }

    #[test]
    fn test_success_without_output() {
        let report = CommandReport::build("mkdir x", &result("  \n", "", false));
        assert_eq!(
            report.display.text(),
            "Command 'mkdir x' executed successfully with no output."
        );
        assert!(report.model.text().ends_with("SUCCEEDED. Output: \"\""));
    }

    #[test]
    fn test_failure_labels_both_streams() {
        let report = CommandReport::build("bad", &result(" partial \n", " boom \n", true));
        assert_eq!(report.display.kind(), MessageKind::ErrorText);
        assert_eq!(
            report.display.text(),
            "Execution of 'bad' FAILED.\nStandard Output:\n partial \n\nErrors:\n boom \n"
        );
        assert_eq!(
            report.model.text(),
            "SystemExecutionResult: Execution of 'bad' FAILED. Standard Output was: \"partial\". Error Output was: \"boom\"."
        );
        assert_eq!(report.model.kind(), MessageKind::ErrorText);
    }

    #[test]
    fn test_success_with_warnings() {
        let report = CommandReport::build("cmd", &result("ok", "warn\n", false));
        assert!(report.display.text().ends_with("\nWarnings:\nwarn\n"));
        assert!(report.model.text().ends_with(". Error Output was: \"warn\""));
    }

    #[test]
    fn test_build_is_pure() {
        let res = result("out", "err", true);
        let first = CommandReport::build("x", &res);
        let second = CommandReport::build("x", &res);
        assert_eq!(first.display.text(), second.display.text());
        assert_eq!(first.display.kind(), second.display.kind());
        assert_eq!(first.model.text(), second.model.text());
        assert_eq!(first.model.kind(), second.model.kind());
    }
}
