//! Test doubles for the integration suite.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rule_pilot_llm::{
    CompletionClient, LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message,
    ProviderConfig, ResponseFormat, RetryPolicy,
};
use rule_pilot_quality_gates::{
    ExecutionOracle, OracleResult, SyntaxOracle, SyntaxVerdict,
};

// ============================================================================
// Routing LLM Provider
// ============================================================================

type Responder = dyn Fn(&[Message], ResponseFormat) -> LlmResult<String> + Send + Sync;

/// One request seen by the provider.
#[derive(Debug, Clone)]
pub struct Call {
    pub messages: Vec<Message>,
    pub format: ResponseFormat,
}

impl Call {
    pub fn system(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    pub fn last(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Provider answering through a closure that sees the whole conversation.
#[derive(Clone)]
pub struct RoutingProvider {
    config: ProviderConfig,
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RoutingProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[Message], ResponseFormat) -> LlmResult<String> + Send + Sync + 'static,
    {
        Self {
            config: ProviderConfig::default(),
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn client(&self) -> CompletionClient {
        CompletionClient::new(Arc::new(self.clone()), RetryPolicy::none())
    }
}

#[async_trait]
impl LlmProvider for RoutingProvider {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn model(&self) -> &str {
        "routing-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let format = request_options.response_format;
        let reply = (self.responder)(&messages, format);
        self.calls.lock().unwrap().push(Call { messages, format });
        reply.map(|text| LlmResponse::text(text, "routing-model"))
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Which pipeline stage a request belongs to, judged from its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reasoning,
    Emission,
    Optimize,
    Render,
    Score,
    Rewrite,
    Classify,
    Convert,
}

pub fn stage_of(messages: &[Message]) -> Stage {
    let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
    if system.contains("We will design a rule step by step") {
        Stage::Reasoning
    } else if system.contains("You translate the reasoning") {
        Stage::Emission
    } else if system.contains("You review DSL programs") {
        Stage::Optimize
    } else if system.contains("Convert the DSL program") {
        Stage::Render
    } else if system.contains("Rate the rule below") {
        Stage::Score
    } else if system.contains("Improve the rule") {
        Stage::Rewrite
    } else if system.contains("You analyse one segment") {
        Stage::Classify
    } else {
        Stage::Convert
    }
}

/// Answers every decomposition and render request with fixed content and
/// delegates the rest to `rest`.
pub fn pipeline_responder<F>(
    query: &'static str,
    rest: F,
) -> impl Fn(&[Message], ResponseFormat) -> LlmResult<String> + Send + Sync + 'static
where
    F: Fn(Stage, &[Message]) -> LlmResult<String> + Send + Sync + 'static,
{
    move |messages, _format| match stage_of(messages) {
        Stage::Reasoning => Ok("Look for failed authentication events.".to_string()),
        Stage::Emission => Ok("```plaintext\nFILTER action=failure\n```".to_string()),
        Stage::Optimize => Ok(
            "```plaintext\nFILTER action=failure\nAGGREGATE count by src_ip\n```".to_string(),
        ),
        Stage::Render => Ok(query.to_string()),
        stage => rest(stage, messages),
    }
}

pub fn score_json(l: f64, s: f64, e: f64) -> String {
    format!(
        r#"{{"logical_coherence": {}, "syntax_validation": {}, "execution_feasibility": {}, "comment": "scored"}}"#,
        l, s, e
    )
}

pub fn unexpected(stage: Stage) -> LlmResult<String> {
    Err(LlmError::Other {
        message: format!("unexpected {:?} request", stage),
    })
}

// ============================================================================
// Recording Oracles
// ============================================================================

/// Shared log of oracle invocations, in call order.
pub type OracleLog = Arc<Mutex<Vec<(String, String)>>>;

pub struct RecordingSyntaxOracle {
    pub log: OracleLog,
    pub verdict: SyntaxVerdict,
}

#[async_trait]
impl SyntaxOracle for RecordingSyntaxOracle {
    async fn check_syntax(&self, query: &str) -> OracleResult<SyntaxVerdict> {
        self.log
            .lock()
            .unwrap()
            .push(("syntax".to_string(), query.to_string()));
        Ok(self.verdict.clone())
    }
}

pub struct RecordingExecutionOracle {
    pub log: OracleLog,
    pub result: String,
}

#[async_trait]
impl ExecutionOracle for RecordingExecutionOracle {
    async fn execute(&self, query: &str) -> OracleResult<String> {
        self.log
            .lock()
            .unwrap()
            .push(("execution".to_string(), query.to_string()));
        Ok(self.result.clone())
    }
}

pub fn recording_oracles(
    log: &OracleLog,
) -> (Arc<RecordingSyntaxOracle>, Arc<RecordingExecutionOracle>) {
    (
        Arc::new(RecordingSyntaxOracle {
            log: log.clone(),
            verdict: SyntaxVerdict::invalid("Unknown search command 'statz'"),
        }),
        Arc::new(RecordingExecutionOracle {
            log: log.clone(),
            result: "<results><result><field k=\"count\">12</field></result></results>".to_string(),
        }),
    )
}
