//! Query Renderer
//!
//! Turns a DSL program, or a bare description on the fast path, into a
//! platform query. Replies are returned verbatim.

use rule_pilot_llm::{CompletionClient, Message};

use crate::models::rule::RuleDescription;
use crate::services::prompts::{
    build_render_message, build_render_prompt, build_simple_generation_message,
    build_simple_generation_prompt,
};
use crate::utils::error::AppResult;

#[derive(Debug, Clone)]
pub struct Renderer {
    client: CompletionClient,
}

impl Renderer {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Render a DSL program into a query for the description's platform.
    pub async fn render(&self, description: &RuleDescription, dsl: &str) -> AppResult<String> {
        let messages = vec![
            Message::system(build_render_prompt(description)),
            Message::user(build_render_message(dsl, &description.text)),
        ];
        let query = self.client.complete_text(&messages).await?;
        tracing::debug!(query_chars = query.len(), "rendered query");
        Ok(query)
    }

    /// Generate a query straight from the description, without a DSL.
    pub async fn render_simple(&self, description: &RuleDescription) -> AppResult<String> {
        let messages = vec![
            Message::system(build_simple_generation_prompt(description.platform)),
            Message::user(build_simple_generation_message(description)),
        ];
        Ok(self.client.complete_text(&messages).await?)
    }
}
