//! Reflection Quality Gate
//!
//! Evaluates a `ReflectionScore` dimension by dimension against a single
//! acceptance threshold. A dimension passes when its value is at least the
//! threshold; anything strictly below fails. Results always come back in the
//! fixed dimension order, which is also the order repairs are applied in.

use rule_pilot_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

use crate::models::{GateStatus, QualityDimension, ReflectionScore};

/// Default acceptance threshold for every dimension.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

// ============================================================================
// Result Types
// ============================================================================

/// Verdict for a single dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionResult {
    pub dimension: QualityDimension,
    pub score: f64,
    pub status: GateStatus,
}

/// Verdict for a whole score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    /// Whether every dimension passed
    pub passed: bool,
    /// Per-dimension verdicts, in fixed dimension order
    pub results: Vec<DimensionResult>,
}

impl GateReport {
    fn new(results: Vec<DimensionResult>) -> Self {
        let passed = results.iter().all(|r| r.status.is_success());
        Self { passed, results }
    }

    /// Dimensions that failed, in fixed dimension order.
    pub fn failing_dimensions(&self) -> Vec<QualityDimension> {
        self.results
            .iter()
            .filter(|r| !r.status.is_success())
            .map(|r| r.dimension)
            .collect()
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Threshold gate over reflection scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    threshold: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl QualityGate {
    /// Create a gate with a custom threshold in `[0, 1]`.
    pub fn new(threshold: f64) -> CoreResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoreError::validation(format!(
                "score threshold must lie in [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether a single value clears the threshold.
    pub fn passes(&self, value: f64) -> bool {
        value >= self.threshold
    }

    /// Evaluate every dimension of a score.
    pub fn evaluate(&self, score: &ReflectionScore) -> GateReport {
        let results = QualityDimension::ALL
            .iter()
            .map(|dimension| {
                let value = score.get(*dimension);
                DimensionResult {
                    dimension: *dimension,
                    score: value,
                    status: if self.passes(value) {
                        GateStatus::Passed
                    } else {
                        GateStatus::Failed
                    },
                }
            })
            .collect();
        GateReport::new(results)
    }

    /// Shorthand for `evaluate(score).failing_dimensions()`.
    pub fn failing_dimensions(&self, score: &ReflectionScore) -> Vec<QualityDimension> {
        self.evaluate(score).failing_dimensions()
    }
}

// ============================================================================
// Tests
// ============================================================================
