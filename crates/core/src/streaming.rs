//! Pipeline Event Types
//!
//! Progress events pushed by the rule generation pipeline to whoever is
//! displaying it. The producer sends events over a channel as each
//! decomposition step finishes; the consumer renders them in arrival order.
//!
//! Ordering contract for one decomposition:
//! `StepReasoning` then `StepStatements` for every step, in step order,
//! followed by exactly one `FinalResult`. The rule generator may append a
//! `FinalRule` once the optimized program has been rendered.

use serde::{Deserialize, Serialize};

/// Stage name of the optimized DSL program event.
pub const FINAL_RESULT_STAGE: &str = "FINAL_RESULT";

/// Stage name of the rendered platform query event.
pub const FINAL_RULE_STAGE: &str = "FINAL_RULE";

/// A staged result produced by the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Free-text reasoning produced for a decomposition step
    StepReasoning { step: String, text: String },

    /// DSL statements emitted for a decomposition step (possibly empty)
    StepStatements {
        step: String,
        statements: Vec<String>,
    },

    /// The optimized DSL program, ends a decomposition
    FinalResult { program: String },

    /// The platform query rendered from the optimized program
    FinalRule { query: String },
}

impl PipelineEvent {
    /// The stage name this event belongs to.
    pub fn stage(&self) -> &str {
        match self {
            PipelineEvent::StepReasoning { step, .. } => step,
            PipelineEvent::StepStatements { step, .. } => step,
            PipelineEvent::FinalResult { .. } => FINAL_RESULT_STAGE,
            PipelineEvent::FinalRule { .. } => FINAL_RULE_STAGE,
        }
    }

    /// Render the event payload as display text.
    pub fn content(&self) -> String {
        match self {
            PipelineEvent::StepReasoning { text, .. } => text.clone(),
            PipelineEvent::StepStatements { statements, .. } => statements.join("\n"),
            PipelineEvent::FinalResult { program } => program.clone(),
            PipelineEvent::FinalRule { query } => query.clone(),
        }
    }

    /// Whether this event terminates a decomposition stream.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            PipelineEvent::FinalResult { .. } | PipelineEvent::FinalRule { .. }
        )
    }
}
