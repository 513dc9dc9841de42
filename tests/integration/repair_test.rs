//! Repair Controller Integration Tests
//!
//! Feedback gathering order, oracle inputs and rewrite bases.

use std::sync::Arc;

use rule_pilot::models::rule::{Platform, RuleDescription};
use rule_pilot::services::RepairController;
use rule_pilot_quality_gates::{QualityDimension, QualityGate, ReflectionScore, UnavailableOracle};

use crate::support::{
    pipeline_responder, recording_oracles, stage_of, unexpected, OracleLog, RoutingProvider, Stage,
};

const QUERY: &str = "index=auth | statz count by src_ip";

fn description() -> RuleDescription {
    RuleDescription::new("Count failed logins per source", Platform::Splunk)
}

fn controller(provider: &RoutingProvider, log: &OracleLog) -> RepairController {
    let (syntax, execution) = recording_oracles(log);
    RepairController::new(provider.client(), syntax, execution, QualityGate::default())
}

#[tokio::test]
async fn test_all_failing_gathers_three_feedbacks_in_order() {
    let provider = RoutingProvider::new(pipeline_responder(QUERY, |stage, messages| match stage {
        Stage::Rewrite => {
            let user = &messages[1].content;
            if user.contains("reference DSL decomposition") {
                Ok("after-logic".to_string())
            } else if user.contains("syntax validation tool") {
                Ok("after-syntax".to_string())
            } else {
                Ok("after-execution".to_string())
            }
        }
        other => unexpected(other),
    }));
    let log = OracleLog::default();

    let outcome = controller(&provider, &log)
        .repair(QUERY, &ReflectionScore::new(0.1, 0.2, 0.3), &description())
        .await;

    assert_eq!(
        outcome.dimensions(),
        vec![
            QualityDimension::LogicalCoherence,
            QualityDimension::SyntaxValidation,
            QualityDimension::ExecutionFeasibility,
        ]
    );
    assert_eq!(outcome.query, "after-execution");

    // Oracles are asked about the working query of their turn.
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ("syntax".to_string(), "after-logic".to_string()),
            ("execution".to_string(), "after-syntax".to_string()),
        ]
    );

    // The logical feedback is a fresh decomposition, gathered before any oracle.
    let calls = provider.calls();
    let first_rewrite = calls
        .iter()
        .position(|c| stage_of(&c.messages) == Stage::Rewrite)
        .unwrap();
    assert!(calls[..first_rewrite]
        .iter()
        .any(|c| stage_of(&c.messages) == Stage::Optimize));
    assert_eq!(
        outcome.feedback[0].feedback,
        "FILTER action=failure\nAGGREGATE count by src_ip"
    );

    // Every rewrite request quotes the original query.
    let rewrites: Vec<_> = calls
        .iter()
        .filter(|c| stage_of(&c.messages) == Stage::Rewrite)
        .collect();
    assert_eq!(rewrites.len(), 3);
    for call in rewrites {
        assert!(call.last().contains(QUERY));
    }
}

#[tokio::test]
async fn test_threshold_boundary_makes_no_calls() {
    let provider = RoutingProvider::new(|messages, _| unexpected(stage_of(messages)));
    let log = OracleLog::default();

    let outcome = controller(&provider, &log)
        .repair(QUERY, &ReflectionScore::new(0.6, 0.6, 0.6), &description())
        .await;
    assert_eq!(outcome.query, QUERY);
    assert!(outcome.feedback.is_empty());
    assert!(provider.calls().is_empty());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_oracles_still_rewrite() {
    let provider = RoutingProvider::new(pipeline_responder(QUERY, |stage, _| match stage {
        Stage::Rewrite => Ok("rewritten".to_string()),
        other => unexpected(other),
    }));
    let oracle = Arc::new(UnavailableOracle::new(
        "no Splunk connection is configured",
    ));
    let repair = RepairController::new(
        provider.client(),
        oracle.clone(),
        oracle,
        QualityGate::default(),
    );

    let outcome = repair
        .repair(QUERY, &ReflectionScore::new(1.0, 0.0, 0.0), &description())
        .await;
    assert_eq!(outcome.query, "rewritten");
    assert!(outcome.feedback[0].feedback.contains("no Splunk connection"));
    assert!(outcome.feedback[1].feedback.is_empty());
    assert!(outcome.feedback.iter().all(|f| f.rewritten));
}
