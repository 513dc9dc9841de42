//! Iteration Loop
//!
//! The agent mode of the pipeline: decompose and render once, then score and
//! repair until the query clears the quality gate or the iteration budget is
//! spent. Persistently low quality is not an error; the loop always answers
//! with its latest query.

use std::sync::Arc;

use rule_pilot_llm::CompletionClient;
use rule_pilot_quality_gates::{
    ExecutionOracle, GateReport, QualityGate, ReflectionScore, SyntaxOracle,
};
use serde::Serialize;

use crate::models::dsl::DslProgram;
use crate::models::rule::RuleDescription;
use crate::services::decomposer::Decomposer;
use crate::services::renderer::Renderer;
use crate::services::repair::{RepairController, RepairOutcome};
use crate::services::scorer::ReflectionScorer;
use crate::utils::error::{AppError, AppResult};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every dimension cleared the gate
    Accepted,
    /// The budget ran out; the last repair output is returned
    Exhausted,
    /// A scoring call failed for good; the current query is returned
    ScoringFailed { error: String },
}

/// One score-then-maybe-repair round.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRound {
    /// 1-based round number
    pub iteration: u32,
    /// Query that was scored this round
    pub query: String,
    pub score: ReflectionScore,
    pub report: GateReport,
    /// Present when the round ended in a repair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<RepairOutcome>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub program: DslProgram,
    pub initial_query: String,
    pub final_query: String,
    pub rounds: Vec<IterationRound>,
    pub outcome: RunOutcome,
}

impl AgentRun {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Accepted)
    }
}

pub struct IterationLoop {
    decomposer: Decomposer,
    renderer: Renderer,
    scorer: ReflectionScorer,
    repair: RepairController,
}

impl IterationLoop {
    pub fn new(
        client: CompletionClient,
        syntax_oracle: Arc<dyn SyntaxOracle>,
        execution_oracle: Arc<dyn ExecutionOracle>,
        gate: QualityGate,
    ) -> Self {
        Self {
            decomposer: Decomposer::new(client.clone()),
            renderer: Renderer::new(client.clone()),
            scorer: ReflectionScorer::new(client.clone()),
            repair: RepairController::new(client, syntax_oracle, execution_oracle, gate),
        }
    }

    /// Run the loop with at most `max_iterations` scoring rounds.
    ///
    /// Decomposition and rendering errors propagate. Once a query exists the
    /// run always returns one.
    pub async fn run(&self, description: &RuleDescription, max_iterations: u32) -> AppResult<AgentRun> {
        if max_iterations == 0 {
            return Err(AppError::validation("max_iterations must be at least 1"));
        }

        tracing::info!("=== Analyse phase ===");
        let program = self.decomposer.decompose(description).await?;

        tracing::info!("=== Generation phase ===");
        let initial_query = self
            .renderer
            .render(description, &program.to_text())
            .await?;
        tracing::info!("Initial rule:\n{}", initial_query);

        let gate = *self.repair.gate();
        let mut current = initial_query.clone();
        let mut rounds = Vec::new();
        let mut outcome = RunOutcome::Exhausted;

        for iteration in 1..=max_iterations {
            tracing::info!("=== Reflection iteration {} ===", iteration);
            let score = match self.scorer.score(&current, &description.text).await {
                Ok(score) => score,
                Err(e) => {
                    tracing::warn!("Scoring failed, returning the current rule: {}", e);
                    outcome = RunOutcome::ScoringFailed {
                        error: e.to_string(),
                    };
                    break;
                }
            };
            tracing::info!("Scores => {}", score);

            let report = gate.evaluate(&score);
            if report.passed {
                tracing::info!("All scores are acceptable, rule is final");
                rounds.push(IterationRound {
                    iteration,
                    query: current.clone(),
                    score,
                    report,
                    repair: None,
                });
                outcome = RunOutcome::Accepted;
                break;
            }

            tracing::info!("Scores below threshold, repairing rule");
            let repair = self.repair.repair(&current, &score, description).await;
            let scored_query = std::mem::replace(&mut current, repair.query.clone());
            rounds.push(IterationRound {
                iteration,
                query: scored_query,
                score,
                report,
                repair: Some(repair),
            });
        }

        if outcome == RunOutcome::Exhausted {
            tracing::warn!("Max iterations reached, returning the last version");
        }
        tracing::info!("=== Final rule ===\n{}", current);

        Ok(AgentRun {
            program,
            initial_query,
            final_query: current,
            rounds,
            outcome,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
