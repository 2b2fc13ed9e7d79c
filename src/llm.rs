//! OpenAI-compatible chat-completion client.
//!
//! Sends a single user message per call and returns the first choice's text
//! untouched. No retries: an upstream failure is returned to the caller as-is.

use crate::error::{Result, ShopFilterError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Default provider base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Request timeout in seconds; `0` leaves the transport default in place
pub const DEFAULT_TIMEOUT_SECS: u64 = 0;

/// LLM configuration, built once at startup and handed to [`LlmClient::new`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for `response_format: {"type": "json_object"}`
    pub json_response: bool,
    /// `0` disables the client-side timeout
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_response: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ShopFilterError::Config("LLM API key is empty".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ShopFilterError::Config("LLM base URL is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ShopFilterError::Config("LLM model is empty".to_string()));
        }
        check_temperature(self.temperature).map_err(ShopFilterError::Config)?;
        if self.max_tokens == 0 {
            return Err(ShopFilterError::Config("max tokens must be positive".to_string()));
        }
        Ok(())
    }
}

/// Shared range check for configured and per-request temperatures.
pub(crate) fn check_temperature(temperature: f32) -> std::result::Result<(), String> {
    if (0.0..=2.0).contains(&temperature) {
        Ok(())
    } else {
        Err(format!("temperature {} is outside 0-2", temperature))
    }
}

/// Per-call overrides of the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Model output for one call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// Model actually requested
    pub model: String,
    pub usage: TokenUsage,
}

/// Token usage tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// OpenAI-compatible API request structures
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Provider error envelope: `{"error": {"message": "..."}}`
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Chat-completion client holding one pooled HTTP client.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| ShopFilterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Model used when the caller does not override it.
    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    /// Send `prompt` as the only user message and return the first choice.
    pub async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<Completion> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());
        let temperature = options.temperature.unwrap_or(self.config.temperature);
        let max_tokens = options.max_tokens.unwrap_or(self.config.max_tokens);

        let request_body = ChatCompletionRequest {
            model: &model,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
            response_format: self
                .config
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let api_url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        debug!(
            model = %model,
            temperature = temperature,
            max_tokens = max_tokens,
            prompt_chars = prompt.len(),
            "Sending LLM request"
        );

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or(error_text);
            return Err(ShopFilterError::Api {
                code: status.as_u16(),
                message: format!("LLM API error: {} - {}", status, message),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ShopFilterError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let text = api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| {
                ShopFilterError::Parse("LLM response contained no choices".to_string())
            })?;

        info!(
            model = %model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "LLM request complete"
        );

        Ok(Completion { text, model, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            ..LlmConfig::new("test-key")
        }
    }

    fn completion_body(text: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": text}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })
    }

    #[test]
    fn test_config_validation() {
        assert!(LlmConfig::new("key").validate().is_ok());
        assert!(LlmConfig::new("  ").validate().is_err());
        let hot = LlmConfig {
            temperature: 2.5,
            ..LlmConfig::new("key")
        };
        assert!(hot.validate().is_err());
        let empty = LlmConfig {
            max_tokens: 0,
            ..LlmConfig::new("key")
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_default_config_sets_no_timeout() {
        let config = LlmConfig::new("key");
        assert_eq!(config.timeout_secs, 0);
        assert!(LlmClient::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_complete_sends_expected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}],
                "max_tokens": 300
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(config_for(&server)).expect("client");
        let completion = client
            .complete("hello", &GenerationOptions::default())
            .await
            .expect("completion");

        assert_eq!(completion.text, "hi there");
        assert_eq!(completion.model, "gpt-4o-mini");
        assert_eq!(completion.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_complete_applies_overrides_and_json_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "other-model",
                "max_tokens": 42,
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let config = LlmConfig {
            json_response: true,
            ..config_for(&server)
        };
        let client = LlmClient::new(config).expect("client");
        let options = GenerationOptions {
            model: Some("other-model".to_string()),
            temperature: Some(0.1),
            max_tokens: Some(42),
        };
        let completion = client.complete("x", &options).await.expect("completion");
        assert_eq!(completion.model, "other-model");
        assert_eq!(completion.text, "{}");
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"message": "Incorrect API key provided"}})),
            )
            .mount(&server)
            .await;

        let client = LlmClient::new(config_for(&server)).expect("client");
        let err = client
            .complete("hello", &GenerationOptions::default())
            .await
            .expect_err("should fail");

        match err {
            ShopFilterError::Api { code, message } => {
                assert_eq!(code, 401);
                assert!(message.contains("Incorrect API key provided"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = LlmClient::new(config_for(&server)).expect("client");
        let err = client
            .complete("hello", &GenerationOptions::default())
            .await
            .expect_err("should fail");
        assert!(matches!(err, ShopFilterError::Parse(_)));
    }
}
