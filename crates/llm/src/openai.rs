//! OpenAI-Compatible Provider
//!
//! Implementation of the LlmProvider trait for the OpenAI chat-completions
//! API. DeepSeek and self-hosted Llama gateways expose the same wire format,
//! so one implementation serves every `ProviderType`; only the API root and
//! the key requirements differ.

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, ProviderType,
    ResponseFormat, StopReason, UsageStats,
};
use crate::http_client::{build_http_client, HttpClientOptions};

/// Chat-completions provider for OpenAI-compatible endpoints
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    api_root: String,
}

impl OpenAIProvider {
    /// Create a new provider with the given configuration.
    ///
    /// Fails when no API root is known for the provider (Llama gateways must
    /// set `base_url`) or when the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let api_root = config
            .base_url
            .as_deref()
            .or_else(|| config.provider.default_base_url())
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| LlmError::ProviderUnavailable {
                message: format!("No base URL configured for {}", config.provider),
            })?;

        let client = build_http_client(&HttpClientOptions {
            proxy_url: config.proxy_url.clone(),
            accept_invalid_certs: false,
        })?;

        Ok(Self {
            config,
            client,
            api_root,
        })
    }

    /// Chat-completions endpoint
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_root)
    }

    /// Model listing endpoint, used for health checks
    fn models_url(&self) -> String {
        format!("{}/models", self.api_root)
    }

    /// Hosted providers refuse anonymous calls; self-hosted gateways often
    /// run without keys.
    fn api_key(&self) -> LlmResult<Option<&str>> {
        match (self.config.api_key.as_deref(), self.config.provider) {
            (Some(key), _) => Ok(Some(key)),
            (None, ProviderType::Llama) => Ok(None),
            (None, provider) => Err(missing_api_key_error(&provider.to_string())),
        }
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let openai_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": openai_messages,
            "temperature": request_options
                .temperature_override
                .unwrap_or(self.config.temperature),
        });

        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if request_options.response_format == ResponseFormat::Json {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }

    /// Parse a response from the API
    fn parse_response(&self, response: OpenAIResponse) -> LlmResponse {
        let choice = response.choices.into_iter().next();

        let stop_reason = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        let content = choice.and_then(|c| c.message).and_then(|m| m.content);

        let usage = response
            .usage
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        LlmResponse {
            content,
            stop_reason,
            usage,
            model: response.model,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> LlmResult<reqwest::RequestBuilder> {
        Ok(match self.api_key()? {
            Some(key) => request.bearer_auth(key),
            None => request,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        match self.config.provider {
            ProviderType::OpenAI => "openai",
            ProviderType::DeepSeek => "deepseek",
            ProviderType::Llama => "llama",
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let body = self.build_request_body(&messages, &request_options);

        tracing::debug!(
            provider = self.name(),
            model = %self.config.model,
            messages = messages.len(),
            format = ?request_options.response_format,
            "sending completion request"
        );

        let response = self
            .authorized(self.client.post(self.completions_url()))?
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        let openai_response: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(openai_response))
    }

    async fn health_check(&self) -> LlmResult<()> {
        let response = self
            .authorized(self.client.get(self.models_url()))?
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, self.name()))
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Chat-completions response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
