//! LLM Client implementation
//!
//! Supports two wire formats:
//! - Google Generative AI (Gemini) `generateContent`
//! - OpenAI-compatible `/chat/completions`

use super::{ApiKey, ChatRole, DecisionService};
use crate::agent::cognition::Message;
use crate::config::{LlmConfig, Provider};
use crate::error::ServiceError;
use async_trait::async_trait;
use rand::Rng;
use reqwest::{
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client as HttpClient, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::time::{sleep, Duration};

const ERROR_BODY_ECHO_LIMIT: usize = 200;

/// Main LLM Client
pub struct LlmClient {
    config: LlmConfig,
    http_client: HttpClient,
    system_prompt: Option<String>,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Result<Self, ServiceError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("aicmd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        Ok(LlmClient {
            config,
            http_client,
            system_prompt: None,
        })
    }

    /// Set the system instruction sent with every request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn provider_name(&self) -> String {
        self.config.provider.to_string()
    }

    fn network_error(&self, e: reqwest::Error) -> ServiceError {
        let message = if e.is_timeout() {
            format!("request timed out after {}s", self.config.timeout_secs)
        } else {
            e.to_string()
        };
        ServiceError::Network {
            provider: self.provider_name(),
            message,
        }
    }

    /// Jittered exponential backoff on 429, 5xx and network errors,
    /// respecting Retry-After. Other statuses are returned to the caller.
    async fn retry_with_backoff<F, Fut>(&self, operation: F) -> Result<reqwest::Response, ServiceError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            let wait = match operation().await {
                Ok(response) => {
                    let status = response.status();
                    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if status.is_success() || !retryable || attempt >= max_retries {
                        return Ok(response);
                    }
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(Duration::from_secs);
                    crate::error_log!(
                        "Provider returned {}, retrying (attempt {}/{})",
                        status,
                        attempt + 1,
                        max_retries
                    );
                    retry_after.unwrap_or(delay)
                }
                Err(e) => {
                    if attempt >= max_retries {
                        return Err(self.network_error(e));
                    }
                    crate::error_log!(
                        "Network error: {}, retrying (attempt {}/{})",
                        e,
                        attempt + 1,
                        max_retries
                    );
                    delay
                }
            };

            sleep(wait).await;
            attempt += 1;

            let jitter_ms = rand::thread_rng().gen_range(-250..=250);
            let next_ms = (delay.as_millis() as i64 * 2 + jitter_ms).max(100) as u64;
            delay = Duration::from_millis(next_ms);
        }
    }

    /// Turn a non-success response into a typed error.
    async fn status_error(&self, response: reqwest::Response) -> ServiceError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return ServiceError::Unauthorized {
                provider: self.provider_name(),
            };
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => ServiceError::Api {
                provider: self.provider_name(),
                status: status.as_u16(),
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| "Unknown error".to_string()),
                detail: envelope.error.status,
            },
            Err(_) => ServiceError::Api {
                provider: self.provider_name(),
                status: status.as_u16(),
                message: format!(
                    "{}. Response: {}",
                    status.canonical_reason().unwrap_or("request failed"),
                    truncate(&body, ERROR_BODY_ECHO_LIMIT)
                ),
                detail: None,
            },
        }
    }

    /// Google Gemini API chat
    async fn chat_gemini(&self, history: &[Message], credential: &ApiKey) -> Result<String, ServiceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url().trim_end_matches('/'),
            self.config.model()
        );

        let body = GeminiRequest {
            contents: gemini_contents(history),
            system_instruction: self.system_prompt.as_ref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: text.clone() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            }),
        };

        let response = self
            .retry_with_backoff(|| async {
                self.http_client
                    .post(&url)
                    .query(&[("key", credential.expose())])
                    .header(CONTENT_TYPE, "application/json")
                    .json(&body)
                    .send()
                    .await
            })
            .await?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let text = response.text().await.map_err(|e| self.network_error(e))?;
        let parsed: GeminiResponse = serde_json::from_str(&text).map_err(|e| ServiceError::Decode {
            provider: self.provider_name(),
            message: format!("{}. Response body: {}", e, truncate(&text, ERROR_BODY_ECHO_LIMIT)),
        })?;

        if parsed.candidates.is_empty() {
            if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ServiceError::Blocked {
                    provider: self.provider_name(),
                    reason,
                });
            }
        }

        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }

    /// OpenAI-compatible API chat
    async fn chat_openai(&self, history: &[Message], credential: &ApiKey) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.config.base_url().trim_end_matches('/'));
        let auth = bearer_header(credential)?;

        let body = OpenAiRequest {
            model: self.config.model(),
            messages: openai_messages(self.system_prompt.as_deref(), history),
            max_completion_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .retry_with_backoff(|| async {
                self.http_client
                    .post(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .header(AUTHORIZATION, auth.clone())
                    .json(&body)
                    .send()
                    .await
            })
            .await?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let text = response.text().await.map_err(|e| self.network_error(e))?;
        let parsed: OpenAiResponse = serde_json::from_str(&text).map_err(|e| ServiceError::Decode {
            provider: self.provider_name(),
            message: format!("{}. Response body: {}", e, truncate(&text, ERROR_BODY_ECHO_LIMIT)),
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl DecisionService for LlmClient {
    async fn request_action(
        &self,
        history: &[Message],
        credential: &ApiKey,
    ) -> Result<String, ServiceError> {
        if credential.expose().trim().is_empty() {
            return Err(ServiceError::MissingCredential);
        }
        if history.is_empty() {
            return Err(ServiceError::EmptyHistory);
        }

        crate::info_log!(
            "Chat request: provider={} model={} messages={}",
            self.config.provider,
            self.config.model(),
            history.len()
        );

        let started = Instant::now();
        let result = match self.config.provider {
            Provider::Google => self.chat_gemini(history, credential).await,
            Provider::Openai => self.chat_openai(history, credential).await,
        };

        match &result {
            Ok(text) => crate::info_log!(
                "Chat completed in {:?}: {} chars",
                started.elapsed(),
                text.len()
            ),
            Err(e) => crate::error_log!("Chat failed after {:?}: {}", started.elapsed(), e),
        }
        result
    }
}

/// Convert history to Gemini contents, merging consecutive turns of the
/// same role. Gemini requires the first content to be a user turn.
fn gemini_contents(history: &[Message]) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();

    for message in history {
        if message.text().trim().is_empty() {
            continue;
        }
        let role = match ChatRole::of(message) {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        };

        if let Some(last) = contents.last_mut() {
            if last.role.as_deref() == Some(role) {
                if let Some(part) = last.parts.first_mut() {
                    part.text.push_str("\n\n");
                    part.text.push_str(message.text());
                    continue;
                }
            }
        }

        contents.push(GeminiContent {
            role: Some(role.to_string()),
            parts: vec![GeminiPart {
                text: message.text().to_string(),
            }],
        });
    }

    while contents.first().is_some_and(|c| c.role.as_deref() != Some("user")) {
        contents.remove(0);
    }
    contents
}

fn openai_messages<'a>(system_prompt: Option<&'a str>, history: &'a [Message]) -> Vec<OpenAiMessage<'a>> {
    let system = system_prompt.map(|content| OpenAiMessage {
        role: "system",
        content,
    });
    let turns = history
        .iter()
        .filter(|m| !m.text().trim().is_empty())
        .map(|m| OpenAiMessage {
            role: match ChatRole::of(m) {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: m.text(),
        });
    system.into_iter().chain(turns).collect()
}

/// Build a bearer header, rejecting keys that cannot appear in a header.
fn bearer_header(credential: &ApiKey) -> Result<HeaderValue, ServiceError> {
    let key = credential.expose();
    if key.chars().any(|c| c.is_control()) {
        return Err(ServiceError::InvalidRequest(
            "API key contains control characters".to_string(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| {
        ServiceError::InvalidRequest(format!(
            "API key results in an invalid Authorization header (length {})",
            key.len()
        ))
    })
}

fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

// Gemini API types
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

// OpenAI API types
#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Debug)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// `{"error": {"message": ..., "status": ...}}` as used by both providers
#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(alias = "type")]
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_contents_merge_and_roles() {
        let history = vec![
            Message::agent("leftover reply"),
            Message::user("list files"),
            Message::status("Thinking: need dir"),
            Message::command_log("Executing: dir"),
            Message::agent("Here they are"),
            Message::user("thanks"),
        ];

        let contents = gemini_contents(&history);
        let roles: Vec<_> = contents.iter().map(|c| c.role.clone().unwrap_or_default()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(
            contents[0].parts[0].text,
            "list files\n\nThinking: need dir\n\nExecuting: dir"
        );
        assert_eq!(contents[1].parts[0].text, "Here they are");
    }

    #[test]
    fn test_gemini_request_shape() {
        let body = GeminiRequest {
            contents: gemini_contents(&[Message::user("hi")]),
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: "sys".into() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: None,
                temperature: Some(0.5),
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_gemini_response_text_joins_parts() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"ACTION: speak\n"},{"text":"TEXT: hi"}],"role":"model"},"finishReason":"STOP","index":0}]}"#,
        )
        .unwrap();
        let content = parsed.candidates.into_iter().next().and_then(|c| c.content).unwrap();
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        assert_eq!(text, "ACTION: speak\nTEXT: hi");
    }

    #[test]
    fn test_gemini_blocked_response_decodes() {
        let parsed: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(parsed.candidates.is_empty());
        assert_eq!(parsed.prompt_feedback.and_then(|f| f.block_reason).as_deref(), Some("SAFETY"));
    }

    #[test]
    fn test_openai_messages() {
        let history = vec![Message::user("hi"), Message::agent("hello"), Message::user("  ")];
        let messages = openai_messages(Some("sys"), &history);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(messages[2].content, "hello");
    }

    #[test]
    fn test_error_envelopes() {
        let gemini: ApiErrorEnvelope = serde_json::from_str(
            r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
        )
        .unwrap();
        assert_eq!(gemini.error.message.as_deref(), Some("API key not valid."));
        assert_eq!(gemini.error.status.as_deref(), Some("INVALID_ARGUMENT"));

        let openai: ApiErrorEnvelope = serde_json::from_str(
            r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        )
        .unwrap();
        assert_eq!(openai.error.status.as_deref(), Some("invalid_request_error"));
    }

    #[test]
    fn test_bearer_header_rejects_control_chars() {
        let key = ApiKey::parse("abc\u{7}def").unwrap();
        assert!(bearer_header(&key).is_err());
        let key = ApiKey::parse("sk-123").unwrap();
        assert_eq!(bearer_header(&key).unwrap(), "Bearer sk-123");
    }

    #[tokio::test]
    async fn test_request_action_rejects_empty_history() {
        let client = LlmClient::new(LlmConfig::default()).unwrap();
        let key = ApiKey::parse("k").unwrap();
        let err = client.request_action(&[], &key).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmptyHistory));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
    }
}
