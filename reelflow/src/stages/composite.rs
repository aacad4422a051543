//! Zone 3: reference image and product image composite.

use async_trait::async_trait;
use std::path::PathBuf;

use super::{prompts, RunnerContext, StageRunner};
use crate::core::{ArtifactLocator, ArtifactRole, Zone};
use crate::errors::{ReelflowError, Result};

/// Input of the composite zone.
#[derive(Debug, Clone)]
pub struct CompositeInput {
    /// Caller-supplied reference image.
    pub reference: PathBuf,
    /// Zone 2 output.
    pub product: ArtifactLocator,
    /// Scene description.
    pub scene: String,
}

/// Places the reference subject and the product in one scene and stores
/// `<taskId>_synthesized.*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeImageRunner;

#[async_trait]
impl StageRunner for CompositeImageRunner {
    type Input = CompositeInput;
    type Output = ArtifactLocator;

    fn zone(&self) -> Zone {
        Zone::ImageSynthesis
    }

    async fn run(
        &self,
        ctx: &RunnerContext,
        task_id: &str,
        input: &CompositeInput,
    ) -> Result<ArtifactLocator> {
        let reference = ctx.artifacts.load_image(&input.reference).await?;
        let product = ctx.artifacts.load_image(&input.product.path).await?;
        let prompt = prompts::composite_prompt(&input.scene);

        let backend = ctx.backend.as_ref();
        let artifacts = ctx.artifacts.as_ref();
        let (reference, product, prompt) = (&reference, &product, prompt.as_str());

        ctx.retry
            .execute(Zone::ImageSynthesis.as_str(), move || async move {
                let image = backend
                    .composite_images(reference, product, prompt)
                    .await?
                    .filter(|image| image.is_image())
                    .ok_or_else(|| ReelflowError::no_artifact("no composite image in answer"))?;

                artifacts
                    .persist(task_id, ArtifactRole::Synthesized, &image.data, &image.mime_type)
                    .await
            })
            .await
    }
}
