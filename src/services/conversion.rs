//! Rule Conversion
//!
//! Segment-wise translation of a rule between piped query languages.
//! [`SegmentClassifier`] labels the segments of a source rule;
//! [`RuleConverter`] translates them one by one in a single growing
//! conversation so later segments see how earlier ones were converted.

use rule_pilot_llm::{CompletionClient, Message};
use serde::Deserialize;

use crate::models::dsl::DslKeyword;
use crate::models::platform_rule::{PlatformRule, SegmentLabel};
use crate::models::rule::Platform;
use crate::services::prompts::{
    build_classification_message, build_classification_prompt, build_conversion_message,
    build_conversion_prompt,
};
use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Classification
// ============================================================================

/// Classifier reply. Field lists may come back as a list or a single string.
#[derive(Debug, Deserialize)]
struct RawLabel {
    operation_type: String,
    #[serde(default)]
    input_fields: serde_json::Value,
    #[serde(default)]
    output_fields: serde_json::Value,
}

impl From<RawLabel> for SegmentLabel {
    fn from(raw: RawLabel) -> Self {
        let operation_type = raw.operation_type.trim();
        Self {
            operation_type: DslKeyword::from_name(operation_type)
                .map(|keyword| keyword.as_str().to_string())
                .unwrap_or_else(|| operation_type.to_string()),
            input_fields: field_list(raw.input_fields),
            output_fields: field_list(raw.output_fields),
        }
    }
}

fn field_list(value: serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        serde_json::Value::String(s) => s
            .split(',')
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Labels each segment of a rule with its operation kind.
#[derive(Debug, Clone)]
pub struct SegmentClassifier {
    client: CompletionClient,
}

impl SegmentClassifier {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Parse `text` as a `platform` rule and label every segment.
    ///
    /// A segment whose classification fails stays unlabelled.
    pub async fn analyze(&self, platform: Platform, text: &str) -> AppResult<PlatformRule> {
        let rule = PlatformRule::parse(platform, text)?;
        let system_prompt = build_classification_prompt();

        let mut labels = Vec::with_capacity(rule.segments().len());
        for (index, segment) in rule.segments().iter().enumerate() {
            let messages = vec![
                Message::system(system_prompt.clone()),
                Message::user(build_classification_message(platform, segment.text())),
            ];
            let label = match self.client.complete_json(&messages).await {
                Ok(reply) => match serde_json::from_str::<RawLabel>(reply.trim()) {
                    Ok(raw) => Some(SegmentLabel::from(raw)),
                    Err(e) => {
                        tracing::warn!(segment = index, "unreadable classification: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(segment = index, "classification failed: {}", e);
                    None
                }
            };
            labels.push(label);
        }

        rule.with_labels(labels)
    }
}

// ============================================================================
// Conversion
// ============================================================================

#[derive(Debug, Deserialize)]
struct ConversionReply {
    result: String,
}

/// Translates a rule to another platform, segment by segment.
#[derive(Debug, Clone)]
pub struct RuleConverter {
    client: CompletionClient,
}

impl RuleConverter {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Convert `source` to `target`.
    ///
    /// The result has exactly one segment per source segment, in order.
    /// Unsupported platforms are a configuration error; a reply without a
    /// string `result` is a parse error.
    pub async fn convert(&self, source: &PlatformRule, target: Platform) -> AppResult<PlatformRule> {
        for platform in [source.platform(), target] {
            if !platform.supports_conversion() {
                return Err(AppError::config(format!(
                    "Rule type {} is not supported.",
                    platform
                )));
            }
        }
        tracing::info!(
            source = %source.platform(),
            target = %target,
            segments = source.segments().len(),
            "converting rule"
        );

        let mut messages = vec![Message::system(build_conversion_prompt(target))];
        let mut converted = Vec::with_capacity(source.segments().len());

        for (index, segment) in source.segments().iter().enumerate() {
            messages.push(Message::user(build_conversion_message(
                source.platform(),
                segment.text(),
                segment.operation_kind(),
            )));
            let reply = self.client.complete_json(&messages).await?;
            let parsed: ConversionReply = serde_json::from_str(reply.trim()).map_err(|e| {
                AppError::parse(format!(
                    "Conversion reply for segment {} has no string result: {}",
                    index, e
                ))
            })?;
            tracing::debug!(segment = index, result = %parsed.result, "segment converted");
            messages.push(Message::assistant(reply));
            converted.push(parsed.result);
        }

        PlatformRule::from_converted_segments(target, converted)
    }
}

// ============================================================================
// Tests
// ============================================================================
