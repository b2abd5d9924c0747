use serde::{Deserialize, Serialize};

/// LLM provider types
///
/// Each provider has a default base URL and authentication method.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Provider {
    /// Google Gemini API
    ///
    /// Default URL: https://generativelanguage.googleapis.com
    /// Key passed as the `key` query parameter.
    #[default]
    Google,

    /// OpenAI-compatible API (OpenAI, Ollama, LM Studio, OpenRouter)
    ///
    /// Default URL: https://api.openai.com/v1
    /// Key passed as a bearer token.
    Openai,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Google => "https://generativelanguage.googleapis.com",
            Provider::Openai => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Google => "gemini-1.5-flash-latest",
            Provider::Openai => "gpt-4o-mini",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" | "google-ai" | "google-generativeai" => Ok(Provider::Google),
            "openai" | "ollama" | "lmstudio" | "local" | "openrouter" | "custom" => Ok(Provider::Openai),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl TryFrom<String> for Provider {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Google => write!(f, "Google Gemini"),
            Provider::Openai => write!(f, "OpenAI Compatible"),
        }
    }
}

/// Shell used to run commands chosen by the model
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ShellKind {
    /// Windows PowerShell (`powershell.exe`)
    Powershell,
    /// PowerShell 7+ (`pwsh`)
    Pwsh,
    Sh,
    Bash,
    Cmd,
}

impl Default for ShellKind {
    fn default() -> Self {
        if cfg!(windows) {
            ShellKind::Powershell
        } else {
            ShellKind::Sh
        }
    }
}

impl ShellKind {
    pub fn program(&self) -> &'static str {
        match self {
            ShellKind::Powershell => "powershell.exe",
            ShellKind::Pwsh => "pwsh",
            ShellKind::Sh => "sh",
            ShellKind::Bash => "bash",
            ShellKind::Cmd => "cmd.exe",
        }
    }

    /// Arguments placed before the command string.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            ShellKind::Powershell | ShellKind::Pwsh => &[
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
            ],
            ShellKind::Sh | ShellKind::Bash => &["-c"],
            ShellKind::Cmd => &["/C"],
        }
    }
}

impl std::str::FromStr for ShellKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "powershell" | "powershell.exe" => Ok(ShellKind::Powershell),
            "pwsh" => Ok(ShellKind::Pwsh),
            "sh" => Ok(ShellKind::Sh),
            "bash" => Ok(ShellKind::Bash),
            "cmd" | "cmd.exe" => Ok(ShellKind::Cmd),
            _ => Err(format!("Unknown shell: {}", s)),
        }
    }
}

impl TryFrom<String> for ShellKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ShellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShellKind::Powershell => "powershell",
            ShellKind::Pwsh => "pwsh",
            ShellKind::Sh => "sh",
            ShellKind::Bash => "bash",
            ShellKind::Cmd => "cmd",
        };
        write!(f, "{}", name)
    }
}
