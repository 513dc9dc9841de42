//! RulePilot LLM
//!
//! Provides a unified interface to chat-completion services:
//! - OpenAI
//! - DeepSeek
//! - Llama (self-hosted OpenAI-compatible gateways)
//!
//! Also includes the HTTP client factory and the retrying completion client
//! used by every generation service.

pub mod client;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use client::{create_provider, CompletionClient, RetryPolicy};
pub use http_client::{build_http_client, HttpClientOptions};
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use types::*;
