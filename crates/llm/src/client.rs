//! Completion Client
//!
//! Wraps a provider with a fixed-count retry loop. Every generation service
//! talks to the completion service through this type; switching providers
//! means building a new client from a new `ProviderConfig`, nothing global
//! is mutated.

use std::sync::Arc;
use std::time::Duration;

use super::openai::OpenAIProvider;
use super::provider::LlmProvider;
use super::types::{
    LlmError, LlmRequestOptions, LlmResult, Message, ProviderConfig, ResponseFormat,
};

/// Fixed retry policy: a capped number of attempts with a constant delay
/// between them. No backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never zero.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(2))
    }
}

/// Build the provider for a configuration.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    Ok(Arc::new(OpenAIProvider::new(config)?))
}

/// A completion client bound to one provider configuration.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl CompletionClient {
    /// Wrap an existing provider.
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Build a client for the given provider configuration.
    pub fn with_provider(config: ProviderConfig, retry: RetryPolicy) -> LlmResult<Self> {
        let provider = create_provider(config)?;
        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            "completion client configured"
        );
        Ok(Self::new(provider, retry))
    }

    /// The underlying provider.
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// The active retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send a conversation and return the reply text.
    ///
    /// Transient failures are retried up to `max_attempts` with a fixed delay.
    /// Configuration errors fail immediately. After the last attempt the
    /// failure is returned as `LlmError::RetriesExhausted`.
    pub async fn complete(&self, messages: &[Message], format: ResponseFormat) -> LlmResult<String> {
        let options = LlmRequestOptions {
            response_format: format,
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .provider
                .send_message(messages.to_vec(), options.clone())
                .await
            {
                Ok(response) => {
                    tracing::debug!(
                        attempt,
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "completion succeeded"
                    );
                    return Ok(response.into_text());
                }
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    tracing::warn!("Attempt {} failed with error: {}", attempt, e);
                    if attempt >= self.retry.max_attempts {
                        return Err(LlmError::RetriesExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    if !self.retry.delay.is_zero() {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
    }

    /// Convenience wrapper for free-text completions.
    pub async fn complete_text(&self, messages: &[Message]) -> LlmResult<String> {
        self.complete(messages, ResponseFormat::Text).await
    }

    /// Convenience wrapper for JSON-object completions.
    pub async fn complete_json(&self, messages: &[Message]) -> LlmResult<String> {
        self.complete(messages, ResponseFormat::Json).await
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("retry", &self.retry)
            .finish()
    }
}
