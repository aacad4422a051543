//! Zone 1: keyword research.

use async_trait::async_trait;
use tracing::debug;

use super::{prompts, RunnerContext, StageRunner};
use crate::core::{ProductMetadata, Zone};
use crate::errors::Result;

/// Input of the research zone.
#[derive(Debug, Clone)]
pub struct ResearchInput {
    /// Product keyword.
    pub keyword: String,
}

/// Asks the analysis model for marketing metadata about a keyword.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketResearchRunner;

#[async_trait]
impl StageRunner for MarketResearchRunner {
    type Input = ResearchInput;
    type Output = ProductMetadata;

    fn zone(&self) -> Zone {
        Zone::MarketResearch
    }

    async fn run(
        &self,
        ctx: &RunnerContext,
        task_id: &str,
        input: &ResearchInput,
    ) -> Result<ProductMetadata> {
        let prompt = prompts::research_prompt(&input.keyword);
        let backend = ctx.backend.as_ref();
        let prompt = prompt.as_str();

        let metadata = ctx
            .retry
            .execute(Zone::MarketResearch.as_str(), move || async move {
                let answer = backend.analyze(prompt).await?;
                ProductMetadata::from_value(answer)
            })
            .await?;

        debug!(task_id, title = %metadata.title, tags = metadata.tags.len(), "Research done");
        Ok(metadata)
    }
}
