//! Pipeline Integration Tests
//!
//! Decomposition streaming, the non-agent generator and the iteration loop
//! driven end to end through a routing provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rule_pilot::models::rule::{Platform, RuleDescription};
use rule_pilot::services::{
    Decomposer, DecompositionStep, IterationLoop, RuleGenerator, RunOutcome,
};
use rule_pilot_core::PipelineEvent;
use rule_pilot_llm::{LlmError, ResponseFormat};
use rule_pilot_quality_gates::{QualityDimension, QualityGate, ASSUME_PASS_COMMENT};
use tokio::sync::mpsc;

use crate::support::{
    pipeline_responder, recording_oracles, score_json, stage_of, unexpected, OracleLog,
    RoutingProvider, Stage,
};

const RAW_QUERY: &str = "index=auth action=failure | statz count by src_ip";

fn description() -> RuleDescription {
    RuleDescription::new(
        "Detect more than 10 failed logins from one source within 5 minutes",
        Platform::Splunk,
    )
    .with_required_fields("- src_ip\n- user")
}

fn agent(provider: &RoutingProvider, log: &OracleLog) -> IterationLoop {
    let (syntax, execution) = recording_oracles(log);
    IterationLoop::new(provider.client(), syntax, execution, QualityGate::default())
}

// ============================================================================
// Decomposition
// ============================================================================

#[tokio::test]
async fn test_streaming_contributes_once_per_step_despite_failures() {
    let emissions = Arc::new(AtomicUsize::new(0));
    let counter = emissions.clone();
    let provider = RoutingProvider::new(move |messages, _| match stage_of(messages) {
        Stage::Reasoning => Ok("reasoning".to_string()),
        Stage::Emission => {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            match n {
                1 => Err(LlmError::ServerError {
                    message: "overloaded".to_string(),
                    status: Some(503),
                }),
                4 => Ok("No statements for this step.".to_string()),
                _ => Ok(format!("```plaintext\nFILTER step{}\n```", n + 1)),
            }
        }
        Stage::Optimize => Ok("```plaintext\nFILTER final\n```".to_string()),
        stage => unexpected(stage),
    });
    let decomposer = Decomposer::new(provider.client());
    let (tx, mut rx) = mpsc::channel(64);

    let program = decomposer
        .decompose_streaming(&description(), tx)
        .await
        .unwrap();
    assert_eq!(program.to_text(), "FILTER final");

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 17);

    let statement_events: Vec<(String, Vec<String>)> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StepStatements { step, statements } => {
                Some((step.clone(), statements.clone()))
            }
            _ => None,
        })
        .collect();
    let steps: Vec<&str> = statement_events.iter().map(|(s, _)| s.as_str()).collect();
    let expected: Vec<&str> = DecompositionStep::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(steps, expected);
    assert!(statement_events[1].1.is_empty());
    assert!(statement_events[4].1.is_empty());
    assert_eq!(statement_events[0].1, vec!["FILTER step1".to_string()]);
    assert!(matches!(events.last(), Some(PipelineEvent::FinalResult { .. })));
}

#[tokio::test]
async fn test_optimizer_sees_draft_in_step_order() {
    let emissions = Arc::new(AtomicUsize::new(0));
    let counter = emissions.clone();
    let seen = Arc::new(Mutex::new(String::new()));
    let seen_by_provider = seen.clone();
    let provider = RoutingProvider::new(move |messages, _| match stage_of(messages) {
        Stage::Reasoning => Ok("reasoning".to_string()),
        Stage::Emission => {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("```plaintext\nFILTER s{}a\n\nFILTER s{}b\n```", n, n))
        }
        Stage::Optimize => {
            *seen_by_provider.lock().unwrap() = messages[1].content.clone();
            Ok("```plaintext\nFILTER merged\n```".to_string())
        }
        stage => unexpected(stage),
    });

    let decomposition = Decomposer::new(provider.client())
        .decompose_detailed(&description())
        .await
        .unwrap();
    assert_eq!(decomposition.draft.len(), 16);
    let draft_text = decomposition.draft.to_text();
    assert!(seen.lock().unwrap().contains(&draft_text));
    assert!(draft_text.starts_with("FILTER s1a\nFILTER s1b\nFILTER s2a"));
}

#[tokio::test]
async fn test_generator_streaming_and_polish() {
    let provider = RoutingProvider::new(pipeline_responder(RAW_QUERY, |stage, _| match stage {
        Stage::Rewrite => Ok(
            "```spl\nindex=auth action=failure | stats count by src_ip | where count > 10\n```"
                .to_string(),
        ),
        other => unexpected(other),
    }));
    let generator = RuleGenerator::new(provider.client());

    let polished = generator.generate(&description()).await.unwrap();
    assert_eq!(
        polished,
        "index=auth action=failure | stats count by src_ip | where count > 10"
    );

    let (tx, mut rx) = mpsc::channel(64);
    let streamed = generator
        .generate_streaming(&description(), tx)
        .await
        .unwrap();
    assert_eq!(streamed, RAW_QUERY);
    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    assert_eq!(
        last,
        Some(PipelineEvent::FinalRule {
            query: RAW_QUERY.to_string()
        })
    );
}

// ============================================================================
// Iteration Loop
// ============================================================================

#[tokio::test]
async fn test_unparseable_score_is_accepted_in_first_round() {
    let provider = RoutingProvider::new(pipeline_responder(RAW_QUERY, |stage, _| match stage {
        Stage::Score => Ok("The rule looks reasonable.".to_string()),
        other => unexpected(other),
    }));
    let log = OracleLog::default();

    let run = agent(&provider, &log).run(&description(), 3).await.unwrap();
    assert_eq!(run.outcome, RunOutcome::Accepted);
    assert_eq!(run.rounds.len(), 1);
    assert_eq!(run.final_query, RAW_QUERY);
    let score = &run.rounds[0].score;
    for dimension in QualityDimension::ALL {
        assert_eq!(score.get(dimension), 1.0);
    }
    assert_eq!(score.comment.as_deref(), Some(ASSUME_PASS_COMMENT));
    assert!(log.lock().unwrap().is_empty());

    let score_calls: Vec<_> = provider
        .calls()
        .into_iter()
        .filter(|c| stage_of(&c.messages) == Stage::Score)
        .collect();
    assert_eq!(score_calls.len(), 1);
    assert_eq!(score_calls[0].format, ResponseFormat::Json);
}

#[tokio::test]
async fn test_loop_terminates_within_budget_and_returns_last_repair() {
    let rewrites = Arc::new(AtomicUsize::new(0));
    let counter = rewrites.clone();
    let provider = RoutingProvider::new(pipeline_responder(RAW_QUERY, move |stage, _| match stage {
        Stage::Score => Ok(score_json(0.9, 0.2, 0.9)),
        Stage::Rewrite => {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("repair-{}", n))
        }
        other => unexpected(other),
    }));
    let log = OracleLog::default();

    let run = agent(&provider, &log).run(&description(), 3).await.unwrap();
    assert_eq!(run.outcome, RunOutcome::Exhausted);
    assert_eq!(run.rounds.len(), 3);
    assert_eq!(run.final_query, "repair-3");
    assert_eq!(rewrites.load(Ordering::SeqCst), 3);

    let scored: Vec<&str> = run.rounds.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(scored, vec![RAW_QUERY, "repair-1", "repair-2"]);
}

#[tokio::test]
async fn test_scores_are_clamped_before_the_gate() {
    let provider = RoutingProvider::new(pipeline_responder(RAW_QUERY, |stage, _| match stage {
        Stage::Score => Ok(score_json(4.0, 1.5, 2.0)),
        other => unexpected(other),
    }));
    let log = OracleLog::default();

    let run = agent(&provider, &log).run(&description(), 1).await.unwrap();
    assert!(run.is_accepted());
    let score = &run.rounds[0].score;
    for dimension in QualityDimension::ALL {
        let value = score.get(dimension);
        assert!((0.0..=1.0).contains(&value));
    }
}

#[tokio::test]
async fn test_scoring_transport_failure_ends_run_with_current_query() {
    let provider = RoutingProvider::new(pipeline_responder(RAW_QUERY, |stage, _| match stage {
        Stage::Score => Err(LlmError::NetworkError {
            message: "connection refused".to_string(),
        }),
        other => unexpected(other),
    }));
    let log = OracleLog::default();

    let run = agent(&provider, &log).run(&description(), 3).await.unwrap();
    assert!(matches!(run.outcome, RunOutcome::ScoringFailed { .. }));
    assert_eq!(run.final_query, RAW_QUERY);
    assert!(run.rounds.is_empty());
}
