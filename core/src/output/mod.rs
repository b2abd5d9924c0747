//! Output formatting module
//!
//! Renders turn messages by kind, plus configuration and log listings,
//! using colored output.
use crate::agent::cognition::{Message, MessageKind, Sender};
use crate::config::Config;
use console::Style;

/// Output formatter for CLI results
pub struct OutputFormatter {
    // Styles
    cyan: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    green: Style,
    bold: Style,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self {
            cyan: Style::new().cyan(),
            red: Style::new().red(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            green: Style::new().green(),
            bold: Style::new().bold(),
        }
    }
}

impl OutputFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one message according to its kind
    pub fn format_message(&self, message: &Message) -> String {
        match message.kind() {
            MessageKind::NormalText => match message.sender() {
                Sender::Agent => format!("{} {}", self.bold.apply_to("AI:"), message.text()),
                Sender::User => format!("{} {}", self.bold.apply_to("You:"), message.text()),
            },
            MessageKind::CommandLog => self.cyan.apply_to(message.text()).to_string(),
            MessageKind::ErrorText => self.red.apply_to(message.text()).to_string(),
            MessageKind::StatusNote => self.yellow.apply_to(message.text()).to_string(),
        }
    }

    /// Print the messages of one turn, in order
    pub fn print_messages(&self, messages: &[Message]) {
        for message in messages {
            println!("{}", self.format_message(message));
        }
    }

    /// Print an unexpected fault from the turn
    pub fn print_critical(&self, error: &dyn std::fmt::Display) {
        eprintln!(
            "{}",
            self.red.apply_to(format!("Critical agent error: {}", error))
        );
    }

    /// Print the active configuration, credential redacted
    pub fn print_config(&self, config: &Config, key_configured: bool) {
        println!();
        println!("{}", self.bold.apply_to("Current Configuration:"));
        println!("- Provider: {}", self.green.apply_to(config.llm.provider));
        println!("- Model: {}", self.green.apply_to(config.llm.model()));
        println!("- Base URL: {}", config.llm.base_url());
        println!(
            "- API key: {}",
            if key_configured {
                self.green.apply_to("configured")
            } else {
                self.red.apply_to("not set")
            }
        );
        println!(
            "- Max iterations: {}, history limit: {}",
            config.agent.max_iterations, config.agent.history_limit
        );
        println!(
            "- Shell: {} (timeout {}s)",
            config.executor.shell, config.executor.timeout_secs
        );
    }

    /// Print recent debug log lines, oldest first
    pub fn print_logs(&self, lines: &[String]) {
        if lines.is_empty() {
            println!("{}", self.dim.apply_to("No log entries yet."));
            return;
        }
        for line in lines.iter().rev() {
            println!("{}", self.dim.apply_to(line));
        }
    }

    /// Print an informational line
    pub fn print_info(&self, text: &str) {
        println!("{}", self.yellow.apply_to(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: String) -> String {
        console::strip_ansi_codes(&s).to_string()
    }

    #[test]
    fn test_format_by_kind() {
        let fmt = OutputFormatter::new();
        assert_eq!(plain(fmt.format_message(&Message::agent("hello"))), "AI: hello");
        assert_eq!(plain(fmt.format_message(&Message::user("hi"))), "You: hi");
        assert_eq!(
            plain(fmt.format_message(&Message::command_log("Executing: ls"))),
            "Executing: ls"
        );
        assert_eq!(plain(fmt.format_message(&Message::error("boom"))), "boom");
        assert_eq!(
            plain(fmt.format_message(&Message::status("Thinking: x"))),
            "Thinking: x"
        );
    }
}
