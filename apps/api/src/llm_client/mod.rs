/// LLM client: the single point of entry for all Anthropic API calls.
///
/// No other module may call the Anthropic API directly.
///
/// Two modes:
/// - fast: `FAST_MODEL`, output capped at `FAST_MAX_TOKENS`
/// - thinking: `THINKING_MODEL` with an extended-reasoning budget; only the final
///   text block is returned, thinking blocks are discarded
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const FAST_MODEL: &str = "claude-sonnet-4-5";
pub const THINKING_MODEL: &str = "claude-opus-4-1";
const FAST_MAX_TOKENS: u32 = 4096;
const THINKING_MAX_TOKENS: u32 = 16_000;
const THINKING_BUDGET_TOKENS: u32 = 10_000;
/// Retries after the first attempt on 429, 5xx and transport errors.
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("ANTHROPIC_API_KEY is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Which model/budget to draft with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftMode {
    #[default]
    Fast,
    Thinking,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

impl<'a> AnthropicRequest<'a> {
    fn new(mode: DraftMode, system: &'a str, prompt: &'a str) -> Self {
        let (model, max_tokens, thinking) = match mode {
            DraftMode::Fast => (FAST_MODEL, FAST_MAX_TOKENS, None),
            DraftMode::Thinking => (
                THINKING_MODEL,
                THINKING_MAX_TOKENS,
                Some(ThinkingConfig {
                    kind: "enabled",
                    budget_tokens: THINKING_BUDGET_TOKENS,
                }),
            ),
        };
        Self {
            model,
            max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            thinking,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Text of the last `text` block. With extended thinking the response carries
    /// `thinking` blocks first and the answer last.
    pub fn final_text(&self) -> Option<&str> {
        self.content
            .iter()
            .rev()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic and structured output helpers.
/// Constructed once in `main` and shared through `AppState`.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            api_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Points the client at a local stand-in for the Messages API.
    #[cfg(test)]
    pub fn with_api_url(api_key: &str, api_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            api_url,
            ..Self::new(Some(api_key.to_string()))?
        })
    }

    /// Makes a raw call to the Messages API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(
        &self,
        mode: DraftMode,
        system: &str,
        prompt: &str,
    ) -> Result<LlmResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let request_body = AnthropicRequest::new(mode, system, prompt);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded ({:?}): input_tokens={}, output_tokens={}",
                mode, llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Drafts free text from a system instruction and a user brief.
    pub async fn draft(&self, mode: DraftMode, system: &str, brief: &str) -> Result<String, LlmError> {
        let response = self.call(mode, system, brief).await?;
        response
            .final_text()
            .map(str::to_owned)
            .ok_or(LlmError::EmptyContent)
    }

    /// Calls the LLM and deserializes the final text block as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn draft_json<T: DeserializeOwned>(
        &self,
        mode: DraftMode,
        system: &str,
        brief: &str,
    ) -> Result<T, LlmError> {
        let text = self.draft(mode, system, brief).await?;
        serde_json::from_str(strip_json_fences(&text)).map_err(LlmError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_fast_request_has_no_thinking_block() {
        let request = AnthropicRequest::new(DraftMode::Fast, "sys", "brief");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], FAST_MODEL);
        assert_eq!(json["max_tokens"], FAST_MAX_TOKENS);
        assert!(json.get("thinking").is_none());
    }

    #[test]
    fn test_thinking_request_uses_separate_model_and_budget() {
        let request = AnthropicRequest::new(DraftMode::Thinking, "sys", "brief");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], THINKING_MODEL);
        assert_eq!(json["max_tokens"], THINKING_MAX_TOKENS);
        assert_eq!(json["thinking"]["type"], "enabled");
        assert_eq!(json["thinking"]["budget_tokens"], THINKING_BUDGET_TOKENS);
        assert!(THINKING_BUDGET_TOKENS < THINKING_MAX_TOKENS);
    }

    #[test]
    fn test_final_text_skips_thinking_blocks() {
        let response: LlmResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "thinking", "thinking": "weighing options..."},
                {"type": "text", "text": "Final proposal text"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }))
        .unwrap();
        assert_eq!(response.final_text(), Some("Final proposal text"));
    }

    #[test]
    fn test_final_text_none_when_only_thinking() {
        let response: LlmResponse = serde_json::from_value(serde_json::json!({
            "content": [{"type": "thinking", "thinking": "..."}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap();
        assert!(response.final_text().is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let client = LlmClient::new(None).unwrap();
        let err = client.draft(DraftMode::Fast, "sys", "brief").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_parses_fenced_json() {
        use crate::test_support::{messages_reply, MessagesApi};
        use axum::http::StatusCode;

        let api = MessagesApi::start(vec![
            (StatusCode::SERVICE_UNAVAILABLE, serde_json::json!({"error": {"message": "overloaded"}})),
            (StatusCode::OK, messages_reply("```json\n{\"title\": \"Audit\"}\n```")),
        ])
        .await;

        let value: serde_json::Value = api
            .client()
            .draft_json(DraftMode::Thinking, "sys", "brief")
            .await
            .unwrap();
        assert_eq!(value["title"], "Audit");

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1]["model"], THINKING_MODEL);
        assert_eq!(requests[1]["system"], "sys");
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        use crate::test_support::MessagesApi;
        use axum::http::StatusCode;

        let api = MessagesApi::start(vec![(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": {"message": "max_tokens too large"}}),
        )])
        .await;

        let err = api.client().draft(DraftMode::Fast, "sys", "brief").await.unwrap_err();
        assert!(
            matches!(&err, LlmError::Api { status: 400, message } if message == "max_tokens too large"),
            "{err:?}"
        );
        assert_eq!(api.requests().len(), 1);
    }
}
