//! DSL Optimizer
//!
//! Consolidates the draft produced by the decomposition steps into a single
//! coherent program with one completion call.

use rule_pilot_llm::{CompletionClient, Message};

use crate::models::dsl::{DslProgram, DslStatement};
use crate::services::prompts::{build_dsl_optimize_message, build_dsl_optimize_prompt};
use crate::utils::error::{AppError, AppResult};
use crate::utils::fence::extract_fenced_block;

#[derive(Debug, Clone)]
pub struct DslOptimizer {
    client: CompletionClient,
}

impl DslOptimizer {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Rewrite a draft into the final program.
    ///
    /// The reply must carry a ```` ```plaintext ```` block; its absence is a
    /// parse error. The block is normalized into one statement per non-blank
    /// line, in order. Completion failures propagate.
    pub async fn optimize(&self, draft: &[DslStatement], description: &str) -> AppResult<DslProgram> {
        let draft_text = draft
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let messages = vec![
            Message::system(build_dsl_optimize_prompt()),
            Message::user(build_dsl_optimize_message(&draft_text, description)),
        ];
        let reply = self.client.complete_text(&messages).await?;
        tracing::debug!(
            draft_statements = draft.len(),
            reply_chars = reply.len(),
            "dsl optimization reply"
        );

        let block = extract_fenced_block(&reply, "plaintext").ok_or_else(|| {
            AppError::parse("DSL optimization reply has no ```plaintext block")
        })?;
        let program = DslProgram::from_text(&block);
        let untagged = program.untagged().count();
        if untagged > 0 {
            tracing::debug!(untagged, "optimized program has statements without a keyword");
        }
        Ok(program)
    }
}
