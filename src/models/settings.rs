//! Settings Models
//!
//! Application configuration: completion providers, the Splunk oracle
//! connection and pipeline tuning. Loaded from TOML and environment
//! variables, never written back.

use std::collections::BTreeMap;
use std::time::Duration;

use rule_pilot_llm::{ProviderConfig, ProviderType, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Environment variable selecting the default provider.
pub const PROVIDER_ENV: &str = "RULE_PILOT_PROVIDER";

/// Application configuration stored in config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider used when none is given on the command line
    pub default_provider: String,
    /// Per-provider connection settings, keyed by provider name
    pub providers: BTreeMap<String, ProviderSettings>,
    /// Splunk connection for the feedback oracles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splunk: Option<SplunkSettings>,
    /// Iteration and retry tuning
    pub pipeline: PipelineSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderType::OpenAI.to_string(),
            providers: BTreeMap::new(),
            splunk: None,
            pipeline: PipelineSettings::default(),
        }
    }
}

/// Connection settings for one completion provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

/// Splunk management endpoint used by the syntax and execution oracles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplunkSettings {
    pub host: String,
    #[serde(default = "default_splunk_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Verify the server certificate (management ports are usually self-signed)
    #[serde(default)]
    pub verify_tls: bool,
}

fn default_splunk_port() -> u16 {
    8089
}

impl SplunkSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_splunk_port(),
            username: String::new(),
            password: String::new(),
            verify_tls: false,
        }
    }
}

/// Iteration loop and retry tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub max_iterations: u32,
    pub score_threshold: f64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            score_threshold: 0.6,
            retry_attempts: 5,
            retry_delay_ms: 2000,
        }
    }
}

impl PipelineSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let pipeline = &self.pipeline;
        if !(0.0..=1.0).contains(&pipeline.score_threshold) {
            return Err(format!(
                "score_threshold must lie in [0, 1], got {}",
                pipeline.score_threshold
            ));
        }
        if pipeline.max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }
        if pipeline.retry_attempts == 0 {
            return Err("retry_attempts must be at least 1".to_string());
        }
        if let Some(splunk) = &self.splunk {
            if splunk.host.trim().is_empty() {
                return Err("splunk.host must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Resolve the provider configuration for a provider name.
    ///
    /// Unknown names are a configuration error. Missing settings fall back
    /// to the provider defaults.
    pub fn provider_config(&self, name: &str) -> AppResult<ProviderConfig> {
        let provider: ProviderType = name
            .parse()
            .map_err(|_| AppError::config(format!("Unknown provider: {}", name)))?;
        let settings = self
            .providers
            .get(provider.to_string().as_str())
            .cloned()
            .unwrap_or_default();

        let defaults = ProviderConfig::default();
        Ok(ProviderConfig {
            provider,
            api_key: settings.api_key,
            base_url: settings.base_url,
            model: settings.model.unwrap_or(defaults.model),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature.unwrap_or(defaults.temperature),
            proxy_url: settings.proxy_url,
        })
    }

    /// Provider configuration for `default_provider`.
    pub fn default_provider_config(&self) -> AppResult<ProviderConfig> {
        self.provider_config(&self.default_provider)
    }

    /// Overlay values read through `get` (normally `std::env::var`).
    ///
    /// Recognises `{OPENAI,DEEPSEEK,LLAMA}_{API_KEY,BASE_URL,MODEL_NAME}`,
    /// `SPLUNK_{HOST,PORT,USERNAME,PASSWORD}` and `RULE_PILOT_PROVIDER`.
    pub fn apply_env<F>(&mut self, get: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| get(key).filter(|value| !value.trim().is_empty());

        if let Some(provider) = read(PROVIDER_ENV) {
            self.default_provider = provider.trim().to_lowercase();
        }

        for provider in ProviderType::ALL {
            let prefix = provider.env_prefix();
            let api_key = read(&format!("{}_API_KEY", prefix));
            let base_url = read(&format!("{}_BASE_URL", prefix));
            let model = read(&format!("{}_MODEL_NAME", prefix));
            if api_key.is_none() && base_url.is_none() && model.is_none() {
                continue;
            }
            let entry = self.providers.entry(provider.to_string()).or_default();
            if api_key.is_some() {
                entry.api_key = api_key;
            }
            if base_url.is_some() {
                entry.base_url = base_url;
            }
            if model.is_some() {
                entry.model = model;
            }
        }

        if let Some(host) = read("SPLUNK_HOST") {
            self.splunk
                .get_or_insert_with(|| SplunkSettings::new(host.clone()))
                .host = host.clone();
        }
        if let Some(splunk) = self.splunk.as_mut() {
            if let Some(port) = read("SPLUNK_PORT") {
                splunk.port = port
                    .trim()
                    .parse()
                    .map_err(|_| AppError::config(format!("Invalid SPLUNK_PORT: {}", port)))?;
            }
            if let Some(username) = read("SPLUNK_USERNAME") {
                splunk.username = username;
            }
            if let Some(password) = read("SPLUNK_PASSWORD") {
                splunk.password = password;
            }
        }
        Ok(())
    }
}
