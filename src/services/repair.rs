//! Repair Controller
//!
//! Rewrites a query dimension by dimension. For each failing dimension, in
//! fixed order, feedback is gathered from the matching source and a single
//! rewrite call is issued:
//!
//! | Dimension | Feedback source |
//! |-----------|-----------------|
//! | logical_coherence | fresh DSL decomposition of the description |
//! | syntax_validation | syntax oracle, on the working query |
//! | execution_feasibility | execution oracle, on the working query |
//!
//! Each rewrite starts from the query the controller was given, not from the
//! previous rewrite; the last rewrite is the one that survives.

use std::sync::Arc;

use rule_pilot_llm::{CompletionClient, Message};
use rule_pilot_quality_gates::{
    ExecutionOracle, QualityDimension, QualityGate, ReflectionScore, SyntaxOracle,
};
use serde::Serialize;

use crate::models::rule::RuleDescription;
use crate::services::decomposer::Decomposer;
use crate::services::prompts::{build_repair_message, build_rule_optimize_prompt};

/// Feedback gathered for one dimension and what the rewrite did with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionFeedback {
    pub dimension: QualityDimension,
    /// Text handed to the rewrite call
    pub feedback: String,
    /// Error raised by the feedback source, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
    /// Whether the rewrite call succeeded and replaced the working query
    pub rewritten: bool,
}

/// Result of one repair pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairOutcome {
    /// Working query after the last successful rewrite
    pub query: String,
    /// One entry per failing dimension, in repair order
    pub feedback: Vec<DimensionFeedback>,
}

impl RepairOutcome {
    fn unchanged(query: &str) -> Self {
        Self {
            query: query.to_string(),
            feedback: Vec::new(),
        }
    }

    /// Dimensions that were repaired, in order.
    pub fn dimensions(&self) -> Vec<QualityDimension> {
        self.feedback.iter().map(|f| f.dimension).collect()
    }
}

pub struct RepairController {
    client: CompletionClient,
    decomposer: Decomposer,
    syntax_oracle: Arc<dyn SyntaxOracle>,
    execution_oracle: Arc<dyn ExecutionOracle>,
    gate: QualityGate,
}

impl RepairController {
    pub fn new(
        client: CompletionClient,
        syntax_oracle: Arc<dyn SyntaxOracle>,
        execution_oracle: Arc<dyn ExecutionOracle>,
        gate: QualityGate,
    ) -> Self {
        let decomposer = Decomposer::new(client.clone());
        Self {
            client,
            decomposer,
            syntax_oracle,
            execution_oracle,
            gate,
        }
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Repair `query` along every dimension the gate rejects.
    ///
    /// Never fails: a broken feedback source degrades the feedback, and a
    /// failed rewrite leaves the working query as it was.
    pub async fn repair(
        &self,
        query: &str,
        scores: &ReflectionScore,
        description: &RuleDescription,
    ) -> RepairOutcome {
        let failing = self.gate.failing_dimensions(scores);
        if failing.is_empty() {
            return RepairOutcome::unchanged(query);
        }
        tracing::info!(dimensions = ?failing, "repairing query");

        let system_prompt = build_rule_optimize_prompt(description.platform);
        let mut working = query.to_string();
        let mut feedback_log = Vec::with_capacity(failing.len());

        for dimension in failing {
            let (feedback, source_error) = self.gather_feedback(dimension, &working, description).await;

            let messages = vec![
                Message::system(system_prompt.clone()),
                Message::user(build_repair_message(
                    query,
                    &description.text,
                    &feedback_source(dimension, description),
                    &feedback,
                )),
            ];
            let rewritten = match self.client.complete_text(&messages).await {
                Ok(reply) => {
                    working = reply.trim().to_string();
                    true
                }
                Err(e) => {
                    tracing::warn!(%dimension, "rewrite failed, keeping working query: {}", e);
                    false
                }
            };

            feedback_log.push(DimensionFeedback {
                dimension,
                feedback,
                source_error,
                rewritten,
            });
        }

        RepairOutcome {
            query: working,
            feedback: feedback_log,
        }
    }

    /// Feedback text for a dimension, plus the source error when it failed.
    async fn gather_feedback(
        &self,
        dimension: QualityDimension,
        working: &str,
        description: &RuleDescription,
    ) -> (String, Option<String>) {
        match dimension {
            QualityDimension::SyntaxValidation => {
                match self.syntax_oracle.check_syntax(working).await {
                    Ok(verdict) => (verdict.feedback_text(), None),
                    Err(e) => {
                        tracing::warn!("syntax oracle failed: {}", e);
                        (e.to_string(), Some(e.to_string()))
                    }
                }
            }
            QualityDimension::ExecutionFeasibility => {
                match self.execution_oracle.execute(working).await {
                    Ok(result) => (result, None),
                    Err(e) => {
                        tracing::warn!("execution oracle failed: {}", e);
                        (String::new(), Some(e.to_string()))
                    }
                }
            }
            QualityDimension::LogicalCoherence => {
                match self.decomposer.decompose(description).await {
                    Ok(program) => (program.to_text(), None),
                    Err(e) => {
                        tracing::warn!("reference decomposition failed: {}", e);
                        (String::new(), Some(e.to_string()))
                    }
                }
            }
        }
    }
}

/// Where a dimension's feedback came from, as phrased in the rewrite request.
fn feedback_source(dimension: QualityDimension, description: &RuleDescription) -> String {
    match dimension {
        QualityDimension::LogicalCoherence => {
            "a reference DSL decomposition of the description".to_string()
        }
        QualityDimension::SyntaxValidation => "the syntax validation tool".to_string(),
        QualityDimension::ExecutionFeasibility => format!(
            "the execution feasibility tool ({} API)",
            description.platform.display_name()
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
