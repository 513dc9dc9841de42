//! Reflection Scorer
//!
//! Asks the model to rate a candidate query on the three quality dimensions.
//! An unreadable reply is replaced by the optimistic all-pass score so a run
//! always moves forward.

use rule_pilot_llm::{CompletionClient, Message};
use rule_pilot_quality_gates::ReflectionScore;

use crate::services::prompts::build_score_prompt;
use crate::utils::error::AppResult;

#[derive(Debug, Clone)]
pub struct ReflectionScorer {
    client: CompletionClient,
}

impl ReflectionScorer {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Score a query against its description.
    ///
    /// Transport failures propagate; parse failures yield
    /// [`ReflectionScore::assume_pass`].
    pub async fn score(&self, query: &str, description: &str) -> AppResult<ReflectionScore> {
        let messages = vec![Message::system(build_score_prompt(query, description))];
        let reply = self.client.complete_json(&messages).await?;

        match ReflectionScore::from_json(&reply) {
            Ok(score) => Ok(score),
            Err(e) => {
                tracing::warn!("Failed to parse reflection result ({}), assuming pass", e);
                Ok(ReflectionScore::assume_pass())
            }
        }
    }
}
