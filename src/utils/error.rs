//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.

use rule_pilot_core::CoreError;
use rule_pilot_llm::LlmError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (unknown provider, unknown platform, unsupported conversion)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion service errors (auto-converted from LlmError)
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Core model errors (auto-converted from CoreError)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration file errors
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A model reply did not have the required structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error stems from configuration rather than a failed call.
    pub fn is_configuration(&self) -> bool {
        match self {
            AppError::Config(_) => true,
            AppError::Llm(e) => e.is_configuration(),
            _ => false,
        }
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
