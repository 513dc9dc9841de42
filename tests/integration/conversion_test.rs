//! Conversion Integration Tests
//!
//! Segmenting, classifying and converting rules between Splunk and Sentinel.

use rule_pilot::models::platform_rule::PlatformRule;
use rule_pilot::models::rule::Platform;
use rule_pilot::services::{RuleConverter, SegmentClassifier};
use rule_pilot::utils::error::AppError;
use rule_pilot_llm::MessageRole;
use serde_json::json;

use crate::support::{stage_of, unexpected, RoutingProvider, Stage};

#[test]
fn test_round_trip_segments() {
    let rule = PlatformRule::parse(Platform::Splunk, "index=main | stats count by host").unwrap();
    let segments: Vec<&str> = rule.segments().iter().map(|s| s.text()).collect();
    assert_eq!(segments, vec!["index=main ", " stats count by host"]);
    assert_eq!(rule.text().matches('|').count(), 1);
    assert_eq!(segments.join("|"), rule.text());
}

#[tokio::test]
async fn test_classify_then_convert() {
    let provider = RoutingProvider::new(|messages, _| match stage_of(messages) {
        Stage::Classify => {
            let segment = messages[1].content.as_str();
            let label = if segment.contains("stats") {
                json!({"operation_type": "AGGREGATE", "input_fields": ["host"], "output_fields": ["count"]})
            } else {
                json!({"operation_type": "FILTER", "input_fields": [], "output_fields": []})
            };
            Ok(label.to_string())
        }
        Stage::Convert => {
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            let result = if last.contains("The operation type is AGGREGATE") {
                "summarize count() by Computer"
            } else {
                "Event"
            };
            Ok(json!({ "result": result }).to_string())
        }
        stage => unexpected(stage),
    });

    let source = SegmentClassifier::new(provider.client())
        .analyze(Platform::Splunk, "index=main | stats count by host")
        .await
        .unwrap();
    assert_eq!(source.segments()[1].operation_kind(), Some("AGGREGATE"));

    let target = RuleConverter::new(provider.client())
        .convert(&source, Platform::Sentinel)
        .await
        .unwrap();
    assert_eq!(target.platform(), Platform::Sentinel);
    assert_eq!(target.segments().len(), source.segments().len());
    assert_eq!(target.text(), "Event | summarize count() by Computer");
}

#[tokio::test]
async fn test_conversion_preserves_order_for_long_rules() {
    let provider = RoutingProvider::new(|messages, _| {
        // Echo the segment position: one user turn per segment so far.
        let turn = messages.iter().filter(|m| m.role == MessageRole::User).count();
        Ok(json!({ "result": format!("part{}", turn) }).to_string())
    });
    let source = PlatformRule::parse(
        Platform::Sentinel,
        "SecurityEvent | where EventID == 4688 | extend cmd = CommandLine | project TimeGenerated, cmd | sort by TimeGenerated",
    )
    .unwrap();

    let target = RuleConverter::new(provider.client())
        .convert(&source, Platform::Splunk)
        .await
        .unwrap();
    let segments: Vec<&str> = target.segments().iter().map(|s| s.text()).collect();
    assert_eq!(segments, vec!["part1", "part2", "part3", "part4", "part5"]);
}

#[tokio::test]
async fn test_elastic_is_rejected_without_calls() {
    let provider = RoutingProvider::new(|messages, _| unexpected(stage_of(messages)));
    let source = PlatformRule::parse(Platform::Splunk, "index=main").unwrap();

    let err = RuleConverter::new(provider.client())
        .convert(&source, Platform::Elastic)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(provider.calls().is_empty());

    assert!(matches!(
        "qradar".parse::<Platform>(),
        Err(AppError::Config(_))
    ));
}

#[tokio::test]
async fn test_reply_without_result_aborts() {
    let provider = RoutingProvider::new(|_, _| Ok(json!({ "query": "x" }).to_string()));
    let source = PlatformRule::parse(Platform::Splunk, "index=main | stats count").unwrap();
    let err = RuleConverter::new(provider.client())
        .convert(&source, Platform::Sentinel)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Parse(_)));
    assert_eq!(provider.calls().len(), 1);
}
