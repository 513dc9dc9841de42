//! Completion Client Integration Tests
//!
//! Retry behaviour against a provider that keeps failing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rule_pilot::models::rule::{Platform, RuleDescription};
use rule_pilot::services::Renderer;
use rule_pilot::utils::error::AppError;
use rule_pilot_llm::{CompletionClient, LlmError, Message, RetryPolicy};

use crate::support::RoutingProvider;

fn failing_provider() -> RoutingProvider {
    RoutingProvider::new(|_, _| {
        Err(LlmError::NetworkError {
            message: "connection reset".to_string(),
        })
    })
}

#[tokio::test]
async fn test_retry_cap_is_honoured() {
    let provider = failing_provider();
    let client = CompletionClient::new(
        Arc::new(provider.clone()),
        RetryPolicy::new(3, Duration::ZERO),
    );

    let err = client
        .complete_text(&[Message::user("hello")])
        .await
        .unwrap_err();
    match err {
        LlmError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("connection reset"));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(provider.calls().len(), 3);
}

#[tokio::test]
async fn test_recovers_before_cap() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let provider = RoutingProvider::new(move |_, _| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(LlmError::ServerError {
                message: "overloaded".to_string(),
                status: Some(529),
            })
        } else {
            Ok("index=main".to_string())
        }
    });
    let client = CompletionClient::new(
        Arc::new(provider.clone()),
        RetryPolicy::new(3, Duration::ZERO),
    );

    let reply = client.complete_text(&[Message::user("hello")]).await.unwrap();
    assert_eq!(reply, "index=main");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_surface_as_llm_error() {
    let provider = failing_provider();
    let renderer = Renderer::new(CompletionClient::new(
        Arc::new(provider.clone()),
        RetryPolicy::new(2, Duration::ZERO),
    ));
    let description = RuleDescription::new("Detect brute force", Platform::Splunk);

    let err = renderer.render_simple(&description).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Llm(LlmError::RetriesExhausted { attempts: 2, .. })
    ));
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test]
async fn test_missing_key_is_not_retried() {
    let provider = RoutingProvider::new(|_, _| {
        Err(LlmError::MissingApiKey {
            provider: "openai".to_string(),
        })
    });
    let client = CompletionClient::new(
        Arc::new(provider.clone()),
        RetryPolicy::new(3, Duration::from_secs(60)),
    );

    let err = client
        .complete_text(&[Message::user("hello")])
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { .. }));
    assert!(err.is_configuration());
    assert_eq!(provider.calls().len(), 1);
}
