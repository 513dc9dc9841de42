//! Rule Generator
//!
//! Non-agent generation paths: decompose, render and polish in one pass, or
//! stream the decomposition to a consumer and finish with the rendered query.

use rule_pilot_core::PipelineEvent;
use rule_pilot_llm::{CompletionClient, Message};
use tokio::sync::mpsc;

use crate::models::rule::RuleDescription;
use crate::services::decomposer::Decomposer;
use crate::services::prompts::{build_polish_message, build_rule_optimize_prompt};
use crate::services::renderer::Renderer;
use crate::utils::error::{AppError, AppResult};
use crate::utils::fence::extract_fenced_block;

#[derive(Debug, Clone)]
pub struct RuleGenerator {
    client: CompletionClient,
    decomposer: Decomposer,
    renderer: Renderer,
}

impl RuleGenerator {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            decomposer: Decomposer::new(client.clone()),
            renderer: Renderer::new(client.clone()),
            client,
        }
    }

    /// Decompose, render, then polish into a bare query.
    pub async fn generate(&self, description: &RuleDescription) -> AppResult<String> {
        tracing::info!("Generating DSL rule");
        let program = self.decomposer.decompose(description).await?;
        tracing::info!("Generating rule from DSL");
        let rendered = self.renderer.render(description, &program.to_text()).await?;
        tracing::info!("Optimizing rule");
        self.polish(&rendered, description).await
    }

    /// Stream the decomposition, then send the rendered query as `FinalRule`.
    pub async fn generate_streaming(
        &self,
        description: &RuleDescription,
        tx: mpsc::Sender<PipelineEvent>,
    ) -> AppResult<String> {
        let program = self
            .decomposer
            .decompose_streaming(description, tx.clone())
            .await?;
        let query = self.renderer.render(description, &program.to_text()).await?;
        let _ = tx
            .send(PipelineEvent::FinalRule {
                query: query.clone(),
            })
            .await;
        Ok(query)
    }

    /// Single-call generation straight from the description.
    pub async fn generate_simple(&self, description: &RuleDescription) -> AppResult<String> {
        self.renderer.render_simple(description).await
    }

    /// Rewrite a rendered query and extract it from its platform code fence.
    ///
    /// A reply without the fence is a parse error.
    pub async fn polish(&self, query: &str, description: &RuleDescription) -> AppResult<String> {
        let platform = description.platform;
        let messages = vec![
            Message::system(build_rule_optimize_prompt(platform)),
            Message::user(build_polish_message(query, &description.text)),
        ];
        let reply = self.client.complete_text(&messages).await?;
        extract_fenced_block(&reply, platform.fence_tag()).ok_or_else(|| {
            AppError::parse(format!(
                "Optimized rule has no ```{} block",
                platform.fence_tag()
            ))
        })
    }
}
