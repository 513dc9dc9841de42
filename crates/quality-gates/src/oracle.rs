//! Feedback Oracles
//!
//! External services consulted only for repair feedback: a grammar checker
//! and a query-execution service. Oracles never generate queries and their
//! failures never block a run; callers decide how to degrade.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reaching or talking to an oracle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// No oracle is configured for this platform
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    /// Network/connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The oracle answered with something unexpected
    #[error("Unexpected oracle response: {0}")]
    Response(String),
}

/// Result type for oracle calls
pub type OracleResult<T> = Result<T, OracleError>;

/// Grammar verdict for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxVerdict {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyntaxVerdict {
    pub fn valid() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }

    /// Text handed to the rewrite call as feedback.
    pub fn feedback_text(&self) -> String {
        match (self.passed, &self.message) {
            (true, _) => "Syntax check passed: the grammar is correct.".to_string(),
            (false, Some(message)) => format!("Syntax error: {}", message),
            (false, None) => "Syntax check failed without an error message.".to_string(),
        }
    }
}

/// Grammar checker for platform queries.
#[async_trait]
pub trait SyntaxOracle: Send + Sync {
    async fn check_syntax(&self, query: &str) -> OracleResult<SyntaxVerdict>;
}

/// Blocking query execution against a live platform.
#[async_trait]
pub trait ExecutionOracle: Send + Sync {
    /// Run the query and return the raw result (or error) text.
    async fn execute(&self, query: &str) -> OracleResult<String>;
}

/// Stand-in used when no platform service is configured.
#[derive(Debug, Clone, Default)]
pub struct UnavailableOracle {
    reason: String,
}

impl UnavailableOracle {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SyntaxOracle for UnavailableOracle {
    async fn check_syntax(&self, _query: &str) -> OracleResult<SyntaxVerdict> {
        Err(OracleError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl ExecutionOracle for UnavailableOracle {
    async fn execute(&self, _query: &str) -> OracleResult<String> {
        Err(OracleError::Unavailable(self.reason.clone()))
    }
}
