//! Quality Gates Models
//!
//! Reflection scores and the quality dimensions they rate.

use rule_pilot_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Comment attached to the optimistic default score.
pub const ASSUME_PASS_COMMENT: &str = "Failed to parse reflection result, assume pass.";

/// Independent quality dimension of a candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    /// Does the query implement what the description asks for
    LogicalCoherence,
    /// Is the query grammatical for its platform
    SyntaxValidation,
    /// Can the query actually run against the platform
    ExecutionFeasibility,
}

impl QualityDimension {
    /// Every dimension, in the fixed evaluation and repair order.
    pub const ALL: [QualityDimension; 3] = [
        QualityDimension::LogicalCoherence,
        QualityDimension::SyntaxValidation,
        QualityDimension::ExecutionFeasibility,
    ];

    /// Key used in the scorer's JSON reply
    pub fn key(&self) -> &'static str {
        match self {
            QualityDimension::LogicalCoherence => "logical_coherence",
            QualityDimension::SyntaxValidation => "syntax_validation",
            QualityDimension::ExecutionFeasibility => "execution_feasibility",
        }
    }
}

impl std::fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Gate verdict for one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Passed,
    Failed,
}

impl GateStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, GateStatus::Passed)
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateStatus::Passed => write!(f, "passed"),
            GateStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Three-dimension quality rating of a candidate query.
///
/// Every value lies in `[0, 1]`. A score is produced fresh by each scoring
/// call and never merged with an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionScore {
    pub logical_coherence: f64,
    pub syntax_validation: f64,
    pub execution_feasibility: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Wire shape of the scorer reply. All three keys are required.
#[derive(Debug, Deserialize)]
struct RawScore {
    logical_coherence: f64,
    syntax_validation: f64,
    execution_feasibility: f64,
    #[serde(default)]
    comment: Option<serde_json::Value>,
}

impl ReflectionScore {
    /// Build a score, clamping every value into `[0, 1]`.
    pub fn new(logical_coherence: f64, syntax_validation: f64, execution_feasibility: f64) -> Self {
        Self {
            logical_coherence: clamp_unit(logical_coherence),
            syntax_validation: clamp_unit(syntax_validation),
            execution_feasibility: clamp_unit(execution_feasibility),
            comment: None,
        }
    }

    /// Attach a free-text comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Optimistic default used when the scorer reply cannot be parsed.
    pub fn assume_pass() -> Self {
        Self::new(1.0, 1.0, 1.0).with_comment(ASSUME_PASS_COMMENT)
    }

    /// Parse a scorer reply.
    ///
    /// The payload must be a JSON object with the three numeric keys; values
    /// outside `[0, 1]` are clamped.
    pub fn from_json(payload: &str) -> CoreResult<Self> {
        let raw: RawScore = serde_json::from_str(payload.trim())
            .map_err(|e| CoreError::parse(format!("Invalid reflection score: {}", e)))?;

        let comment = match raw.comment {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            comment,
            ..Self::new(
                raw.logical_coherence,
                raw.syntax_validation,
                raw.execution_feasibility,
            )
        })
    }

    /// Value for one dimension.
    pub fn get(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::LogicalCoherence => self.logical_coherence,
            QualityDimension::SyntaxValidation => self.syntax_validation,
            QualityDimension::ExecutionFeasibility => self.execution_feasibility,
        }
    }
}

impl std::fmt::Display for ReflectionScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "logical_coherence={:.2} syntax_validation={:.2} execution_feasibility={:.2}",
            self.logical_coherence, self.syntax_validation, self.execution_feasibility
        )?;
        if let Some(comment) = &self.comment {
            write!(f, " ({})", comment)?;
        }
        Ok(())
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
