//! Structured error types for aicmd
//!
//! Library code returns these typed errors. The agent loop converts every
//! [`ServiceError`] into an error message for the user instead of
//! propagating it, so these never reach the caller of a turn.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the decision service (the language model endpoint).
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No credential was handed to the service
    #[error("API key was not provided to the decision service")]
    MissingCredential,

    /// Nothing to send
    #[error("conversation history cannot be empty")]
    EmptyHistory,

    /// Connection, TLS or timeout failure
    #[error("network error contacting {provider}: {message}")]
    Network { provider: String, message: String },

    /// The provider answered with a non-success status
    #[error("{provider} API error: {message} (code: {status}{})", detail.as_deref().map(|d| format!(", status: {}", d)).unwrap_or_default())]
    Api {
        provider: String,
        status: u16,
        message: String,
        detail: Option<String>,
    },

    /// Authentication was rejected
    #[error("authentication failed for {provider}. Check your API key.")]
    Unauthorized { provider: String },

    /// The provider refused to answer the prompt
    #[error("{provider} blocked the request: {reason}")]
    Blocked { provider: String, reason: String },

    /// The response body could not be decoded
    #[error("failed to decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    /// The configured base URL or credential cannot form a request
    #[error("invalid request configuration: {0}")]
    InvalidRequest(String),
}

/// Configuration loading and saving errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error occurred while reading/writing config file
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// A value is present but unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
