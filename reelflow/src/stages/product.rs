//! Zone 2: product image generation.

use async_trait::async_trait;

use super::{prompts, RunnerContext, StageRunner};
use crate::core::{ArtifactLocator, ArtifactRole, Zone};
use crate::errors::{ReelflowError, Result};

/// Input of the product image zone.
#[derive(Debug, Clone)]
pub struct ProductImageInput {
    /// What to depict.
    pub product_description: String,
    /// Style directive.
    pub style: String,
}

/// Generates and stores `<taskId>_product.*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductImageRunner;

#[async_trait]
impl StageRunner for ProductImageRunner {
    type Input = ProductImageInput;
    type Output = ArtifactLocator;

    fn zone(&self) -> Zone {
        Zone::ImageGeneration
    }

    async fn run(
        &self,
        ctx: &RunnerContext,
        task_id: &str,
        input: &ProductImageInput,
    ) -> Result<ArtifactLocator> {
        let prompt = prompts::product_prompt(&input.product_description, &input.style);
        let backend = ctx.backend.as_ref();
        let artifacts = ctx.artifacts.as_ref();
        let prompt = prompt.as_str();

        ctx.retry
            .execute(Zone::ImageGeneration.as_str(), move || async move {
                let image = backend
                    .generate_image(prompt)
                    .await?
                    .filter(|image| image.is_image())
                    .ok_or_else(|| ReelflowError::no_artifact("no product image in answer"))?;

                artifacts
                    .persist(task_id, ArtifactRole::Product, &image.data, &image.mime_type)
                    .await
            })
            .await
    }
}
