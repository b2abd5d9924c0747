//! Decision parser for model replies
//!
//! The model answers in a small line-oriented protocol:
//!
//! ```text
//! ACTION: speak | execute_powershell | error
//! TEXT: <message, may continue over several lines>
//! COMMAND: <single command line>
//! REASON: <why the command is being run>
//! ```
//!
//! Markers are case-insensitive. Lines starting with `Thinking:` are for
//! human display only and are removed before anything else happens.
//! Parsing is a pure function - no async, no IO.

use super::decision::Decision;

/// Stand-in text when the model chose an action but gave it no content.
pub const NO_CONTENT: &str = "<no content provided>";

const REASONING_MARKER: &str = "thinking:";
const UNSPECIFIED_ERROR: &str = "The model reported an unspecified error.";
const COMMAND_MISSING: &str =
    "AI chose to execute a command but the command was missing in the response.";
const RAW_ECHO_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Action,
    Text,
    Command,
    Reason,
}

const MARKERS: [(Marker, &str); 4] = [
    (Marker::Action, "action"),
    (Marker::Text, "text"),
    (Marker::Command, "command"),
    (Marker::Reason, "reason"),
];

/// Recognised action kinds
#[derive(Debug, Clone, PartialEq, Eq)]
enum ActionKind {
    Speak,
    Execute,
    Error,
    Unknown(String),
}

impl ActionKind {
    /// A blank token is an unspecified action, reported like an unknown one.
    fn from_token(token: &str) -> Self {
        let cleaned = token
            .trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '\'' | '`' | '*'))
            .to_lowercase();
        match cleaned.as_str() {
            "speak" => ActionKind::Speak,
            "execute_powershell" => ActionKind::Execute,
            "error" => ActionKind::Error,
            _ => ActionKind::Unknown(cleaned),
        }
    }
}

/// Marker values found in a reply. The first occurrence of each marker wins.
#[derive(Debug, Default)]
struct Fields<'a> {
    action_line: Option<&'a str>,
    action: Option<&'a str>,
    text: Option<Vec<&'a str>>,
    command: Option<&'a str>,
    reason: Option<&'a str>,
}

impl<'a> Fields<'a> {
    fn collect(lines: &[&'a str]) -> Self {
        let mut fields = Fields::default();
        let mut in_text = false;

        for &line in lines {
            match split_marker(line) {
                Some((Marker::Text, value)) if !in_text => {
                    if fields.text.is_none() {
                        fields.text = Some(vec![value]);
                        in_text = true;
                    }
                }
                Some((Marker::Text, _)) => {
                    // A second TEXT marker inside a block is content
                    if let Some(block) = fields.text.as_mut() {
                        block.push(line);
                    }
                }
                Some((marker, value)) => {
                    in_text = false;
                    match marker {
                        Marker::Action if fields.action.is_none() => {
                            fields.action = Some(value);
                            fields.action_line = Some(line.trim());
                        }
                        Marker::Command if fields.command.is_none() => fields.command = Some(value),
                        Marker::Reason if fields.reason.is_none() => fields.reason = Some(value),
                        _ => {}
                    }
                }
                None if in_text => {
                    if let Some(block) = fields.text.as_mut() {
                        block.push(line);
                    }
                }
                None => {}
            }
        }

        fields
    }

    /// TEXT block joined and trimmed; `None` when absent or blank.
    fn text_block(&self) -> Option<String> {
        let block = self.text.as_ref()?.join("\n");
        let block = block.trim();
        if block.is_empty() {
            return None;
        }
        match self.action_line {
            Some(action_line) if is_echo(block, action_line) => Some(NO_CONTENT.to_string()),
            _ => Some(block.to_string()),
        }
    }
}

/// Interpret a raw model reply as exactly one [`Decision`].
pub fn parse_decision(raw: &str) -> Decision {
    let lines: Vec<&str> = raw.lines().filter(|line| !is_reasoning_line(line)).collect();
    let fields = Fields::collect(&lines);

    let Some(action_value) = fields.action else {
        let filtered = lines.join("\n");
        let filtered = filtered.trim();
        if filtered.is_empty() {
            return Decision::MalformedResponse {
                raw_text: raw.to_string(),
            };
        }
        // Conversational answer without the protocol
        return Decision::Speak {
            text: filtered.to_string(),
        };
    };

    let token = action_value.split_whitespace().next().unwrap_or("");
    match ActionKind::from_token(token) {
        ActionKind::Speak => Decision::Speak {
            text: fields.text_block().unwrap_or_else(|| NO_CONTENT.to_string()),
        },
        ActionKind::Execute => match fields.command.map(clean_command).filter(|c| !c.is_empty()) {
            Some(command) => Decision::ExecuteCommand {
                command,
                reasoning: fields.reason.map(str::trim).unwrap_or_default().to_string(),
            },
            None => Decision::Error {
                detail: COMMAND_MISSING.to_string(),
            },
        },
        ActionKind::Error => Decision::Error {
            detail: fields
                .text_block()
                .unwrap_or_else(|| UNSPECIFIED_ERROR.to_string()),
        },
        ActionKind::Unknown(kind) => Decision::Error {
            detail: format!(
                "AI system returned an unknown or unspecified action type ('{}'). AI response content: {}",
                kind,
                truncate_chars(raw.trim(), RAW_ECHO_LIMIT)
            ),
        },
    }
}

fn is_reasoning_line(line: &str) -> bool {
    starts_with_ignore_case(line.trim_start(), REASONING_MARKER)
}

/// Split `NAME: value` into its marker and trimmed value.
fn split_marker(line: &str) -> Option<(Marker, &str)> {
    let trimmed = line.trim_start();
    MARKERS.iter().find_map(|(marker, name)| {
        if !starts_with_ignore_case(trimmed, name) {
            return None;
        }
        let rest = trimmed[name.len()..].trim_start();
        rest.strip_prefix(':').map(|value| (*marker, value.trim()))
    })
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Whether `value` merely repeats the ACTION line it belongs to.
fn is_echo(value: &str, action_line: &str) -> bool {
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    normalize(value) == normalize(action_line)
}

/// Drop a single pair of wrapping backticks some models add.
fn clean_command(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('`')
        .and_then(|v| v.strip_suffix('`'))
        .unwrap_or(value)
        .trim()
        .to_string()
}

fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
