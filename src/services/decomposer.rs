//! Rule Decomposer
//!
//! Turns a rule description into a DSL program through eight fixed reasoning
//! steps. Two conversations grow side by side:
//!
//! - the reasoning history, where the model thinks about one step at a time;
//! - the emission history, where each step's reasoning is translated into DSL
//!   statements inside a ```` ```plaintext ```` block.
//!
//! A failed step contributes nothing and the loop moves on, except for
//! configuration errors, which end the decomposition. The collected draft is
//! then consolidated by the [`DslOptimizer`].

use rule_pilot_core::PipelineEvent;
use rule_pilot_llm::{CompletionClient, LlmError, Message};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::dsl::DslProgram;
use crate::models::rule::RuleDescription;
use crate::services::dsl_optimizer::DslOptimizer;
use crate::services::prompts::{
    build_dsl_generation_prompt, build_reasoning_background, build_step_message, step_instruction,
};
use crate::utils::error::{AppError, AppResult};
use crate::utils::fence::{extract_fenced_block, non_blank_lines};

// ============================================================================
// Steps
// ============================================================================

/// Fixed decomposition steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecompositionStep {
    UnderstandingProblem,
    IdentifyDataSource,
    DefineInitialFilters,
    ExtractRelevantFields,
    PerformDataAggregation,
    CalculateDerivedMetrics,
    FilterAnomalies,
    OptimizeOutput,
}

impl DecompositionStep {
    pub const ALL: [DecompositionStep; 8] = [
        DecompositionStep::UnderstandingProblem,
        DecompositionStep::IdentifyDataSource,
        DecompositionStep::DefineInitialFilters,
        DecompositionStep::ExtractRelevantFields,
        DecompositionStep::PerformDataAggregation,
        DecompositionStep::CalculateDerivedMetrics,
        DecompositionStep::FilterAnomalies,
        DecompositionStep::OptimizeOutput,
    ];

    /// Stage name used in pipeline events.
    pub fn name(&self) -> &'static str {
        match self {
            DecompositionStep::UnderstandingProblem => "UNDERSTANDING_PROBLEM",
            DecompositionStep::IdentifyDataSource => "IDENTIFY_DATA_SOURCE",
            DecompositionStep::DefineInitialFilters => "DEFINE_INITIAL_FILTERS",
            DecompositionStep::ExtractRelevantFields => "EXTRACT_RELEVANT_FIELDS",
            DecompositionStep::PerformDataAggregation => "PERFORM_DATA_AGGREGATION",
            DecompositionStep::CalculateDerivedMetrics => "CALCULATE_DERIVED_METRICS",
            DecompositionStep::FilterAnomalies => "FILTER_ANOMALIES",
            DecompositionStep::OptimizeOutput => "OPTIMIZE_OUTPUT",
        }
    }

    /// Human-readable label, e.g. `IDENTIFY DATA SOURCE`.
    pub fn label(&self) -> String {
        self.name().replace('_', " ")
    }
}

impl std::fmt::Display for DecompositionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Step Results
// ============================================================================

/// Why a step contributed no statements.
#[derive(Error, Debug, Clone)]
pub enum StepError {
    /// A completion call failed after retries
    #[error("completion failed: {0}")]
    Completion(LlmError),

    /// The model answered without a ```plaintext block
    #[error("reply has no ```plaintext block")]
    MissingBlock,
}

/// Output of a step that went through.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub reasoning: String,
    pub statements: Vec<String>,
}

/// What one step produced, including a degraded outcome.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: DecompositionStep,
    pub reasoning: String,
    pub statements: Vec<String>,
    pub error: Option<StepError>,
}

impl StepRecord {
    fn from_result(step: DecompositionStep, result: Result<StepOutput, (String, StepError)>) -> Self {
        match result {
            Ok(output) => Self {
                step,
                reasoning: output.reasoning,
                statements: output.statements,
                error: None,
            },
            Err((reasoning, error)) => Self {
                step,
                reasoning,
                statements: Vec::new(),
                error: Some(error),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Full trace of a decomposition.
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// One record per step, in step order
    pub steps: Vec<StepRecord>,
    /// Concatenated step statements before optimization
    pub draft: DslProgram,
    /// Optimized program
    pub program: DslProgram,
}

// ============================================================================
// Decomposer
// ============================================================================

#[derive(Debug, Clone)]
pub struct Decomposer {
    client: CompletionClient,
    optimizer: DslOptimizer,
}

/// The two cumulative conversations of one decomposition.
struct Histories {
    reasoning: Vec<Message>,
    emission: Vec<Message>,
}

impl Decomposer {
    pub fn new(client: CompletionClient) -> Self {
        let optimizer = DslOptimizer::new(client.clone());
        Self { client, optimizer }
    }

    /// Decompose a description into an optimized program.
    pub async fn decompose(&self, description: &RuleDescription) -> AppResult<DslProgram> {
        Ok(self.run(description, None).await?.program)
    }

    /// Decompose and keep the per-step trace.
    pub async fn decompose_detailed(&self, description: &RuleDescription) -> AppResult<Decomposition> {
        self.run(description, None).await
    }

    /// Decompose while pushing progress events.
    ///
    /// For every step a `StepReasoning` then a `StepStatements` event is sent;
    /// a `FinalResult` event closes the stream. A dropped receiver does not
    /// stop the decomposition.
    pub async fn decompose_streaming(
        &self,
        description: &RuleDescription,
        tx: mpsc::Sender<PipelineEvent>,
    ) -> AppResult<DslProgram> {
        let decomposition = self.run(description, Some(&tx)).await?;
        let _ = tx
            .send(PipelineEvent::FinalResult {
                program: decomposition.program.to_text(),
            })
            .await;
        Ok(decomposition.program)
    }

    async fn run(
        &self,
        description: &RuleDescription,
        tx: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> AppResult<Decomposition> {
        tracing::info!(platform = %description.platform, "decomposing rule description");

        let mut histories = Histories {
            reasoning: vec![Message::system(build_reasoning_background(description))],
            emission: vec![Message::system(build_dsl_generation_prompt(description))],
        };
        let mut draft = DslProgram::new();
        let mut steps = Vec::with_capacity(DecompositionStep::ALL.len());

        for step in DecompositionStep::ALL {
            let result = self.run_step(&mut histories, step).await;
            let record = StepRecord::from_result(step, result);

            if let Some(StepError::Completion(e)) = &record.error {
                if e.is_configuration() {
                    return Err(AppError::Llm(e.clone()));
                }
            }
            if let Some(error) = &record.error {
                tracing::warn!(step = %step, "decomposition step degraded: {}", error);
            } else {
                tracing::debug!(step = %step, statements = record.statements.len(), "step done");
            }

            if let Some(tx) = tx {
                let _ = tx
                    .send(PipelineEvent::StepReasoning {
                        step: step.name().to_string(),
                        text: record.reasoning.clone(),
                    })
                    .await;
                let _ = tx
                    .send(PipelineEvent::StepStatements {
                        step: step.name().to_string(),
                        statements: record.statements.clone(),
                    })
                    .await;
            }

            draft.append(record.statements.iter().cloned());
            steps.push(record);
        }

        let program = self
            .optimizer
            .optimize(draft.statements(), &description.text)
            .await?;
        tracing::info!(
            draft = draft.len(),
            optimized = program.len(),
            "decomposition finished"
        );

        Ok(Decomposition {
            steps,
            draft,
            program,
        })
    }

    /// Run one step. On failure, returns whatever reasoning was obtained.
    async fn run_step(
        &self,
        histories: &mut Histories,
        step: DecompositionStep,
    ) -> Result<StepOutput, (String, StepError)> {
        histories
            .reasoning
            .push(Message::user(step_instruction(step)));
        let reasoning = self
            .client
            .complete_text(&histories.reasoning)
            .await
            .map_err(|e| (String::new(), StepError::Completion(e)))?;
        histories.reasoning.push(Message::assistant(reasoning.clone()));

        histories
            .emission
            .push(Message::user(build_step_message(step, &reasoning)));
        let reply = match self.client.complete_text(&histories.emission).await {
            Ok(reply) => reply,
            Err(e) => return Err((reasoning, StepError::Completion(e))),
        };
        histories.emission.push(Message::assistant(reply.clone()));

        match extract_fenced_block(&reply, "plaintext") {
            Some(block) => Ok(StepOutput {
                reasoning,
                statements: non_blank_lines(&block),
            }),
            None => Err((reasoning, StepError::MissingBlock)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
