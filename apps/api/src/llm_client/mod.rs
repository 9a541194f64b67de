/// LLM Client: the only code in cvstudio that talks to the Anthropic API.
///
/// The LLM-backed profile generator is its single caller. The model is fixed
/// so regenerated content stays consistent across deployments.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::generation::generator::GenerationError;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
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

impl From<LlmError> for GenerationError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Http(e) => GenerationError::Transport(e.to_string()),
            LlmError::Api { status: 429, .. } | LlmError::RateLimited { .. } => {
                GenerationError::RateLimited
            }
            LlmError::Api { status: 402, .. } => GenerationError::QuotaExhausted,
            LlmError::Api { status, message } => {
                GenerationError::Remote(format!("status {status}: {message}"))
            }
            LlmError::Parse(e) => GenerationError::Malformed(e.to_string()),
            LlmError::EmptyContent => GenerationError::Malformed("empty content".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
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
    /// Text of the first text block, if any.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Result of a single HTTP attempt.
enum Attempt {
    Done(LlmResponse),
    /// Transport failure, 429 or 5xx: worth another try.
    Retry(LlmError),
    Fail(LlmError),
}

/// Wraps the Anthropic Messages API with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on transport errors, 429 and 5xx with exponential backoff (1s, 2s).
    /// Any other failure, including 402 (credits exhausted), is returned at once.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1));
                warn!(
                    "LLM call attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&body).await {
                Attempt::Done(response) => {
                    debug!(
                        "LLM call succeeded: input_tokens={}, output_tokens={}",
                        response.usage.input_tokens, response.usage.output_tokens
                    );
                    return Ok(response);
                }
                Attempt::Retry(e) => last_error = Some(e),
                Attempt::Fail(e) => return Err(e),
            }
        }

        Err(match last_error {
            Some(LlmError::Api { status: 429, .. }) | None => LlmError::RateLimited {
                retries: MAX_RETRIES,
            },
            Some(e) => e,
        })
    }

    async fn attempt(&self, body: &MessagesRequest<'_>) -> Attempt {
        let sent = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(LlmError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.bytes().await {
                Ok(body) => match decode_response(&body) {
                    Ok(parsed) => Attempt::Done(parsed),
                    Err(e) => Attempt::Fail(e),
                },
                Err(e) => Attempt::Retry(LlmError::Http(e)),
            };
        }

        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
            .map(|e| e.error.message)
            .unwrap_or(raw);
        let error = LlmError::Api {
            status: status.as_u16(),
            message,
        };
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            warn!("LLM API returned {status}");
            Attempt::Retry(error)
        } else {
            Attempt::Fail(error)
        }
    }

    /// Calls the LLM and returns the trimmed text of the first text block.
    pub async fn call_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let response = self.call(prompt, system).await?;
        match response.text().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(LlmError::EmptyContent),
        }
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(serde_json::from_str(strip_json_fences(text))?)
    }
}

/// A success body that is not a Messages response is a malformed reply,
/// not a transport failure.
fn decode_response(body: &[u8]) -> Result<LlmResponse, LlmError> {
    Ok(serde_json::from_slice(body)?)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let stripped = stripped.trim_start();
    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"value\": \"x\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"value\": \"x\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n[\"Rust\"]\n```";
        assert_eq!(strip_json_fences(input), "[\"Rust\"]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_undecodable_success_body_is_malformed() {
        let err = decode_response(b"<html>gateway hiccup</html>").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
        assert!(matches!(
            GenerationError::from(err),
            GenerationError::Malformed(_)
        ));
    }

    #[test]
    fn test_messages_body_decodes() {
        let body = br#"{"content":[{"type":"text","text":"hi"}],"usage":{"input_tokens":3,"output_tokens":1}}"#;
        assert_eq!(decode_response(body).unwrap().text(), Some("hi"));
    }

    #[test]
    fn test_llm_errors_keep_rate_limit_and_quota_apart() {
        assert_eq!(
            GenerationError::from(LlmError::RateLimited { retries: 3 }),
            GenerationError::RateLimited
        );
        assert_eq!(
            GenerationError::from(LlmError::Api {
                status: 402,
                message: "credits".into()
            }),
            GenerationError::QuotaExhausted
        );
        assert!(matches!(
            GenerationError::from(LlmError::EmptyContent),
            GenerationError::Malformed(_)
        ));
    }
}
