//! The fixed four-zone sequence.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use super::{PipelineRequest, PipelineResult, ZoneFailure};
use crate::core::{StageEvent, Zone};
use crate::events::ProgressSink;
use crate::observability::{run_span, zone_span, ZoneTimer};
use crate::stages::prompts::{FALLBACK_COMPOSITE_SCENE, FALLBACK_VIDEO_SCENE};
use crate::stages::{
    CompositeImageRunner, CompositeInput, MarketResearchRunner, ProductImageInput,
    ProductImageRunner, ResearchInput, RunnerContext, StageRunner, VideoInput, VideoRunner,
};

fn running_message(zone: Zone) -> &'static str {
    match zone {
        Zone::MarketResearch => "Analyzing trends...",
        Zone::ImageGeneration => "Generating the product image...",
        Zone::ImageSynthesis => "Compositing the reference and the product...",
        Zone::VideoGeneration => "Generating the video... (takes 2-5 minutes)",
    }
}

fn completed_message(zone: Zone) -> &'static str {
    match zone {
        Zone::MarketResearch => "Market research complete",
        Zone::ImageGeneration => "Product image ready",
        Zone::ImageSynthesis => "Composite image ready",
        Zone::VideoGeneration => "Video ready",
    }
}

const SKIPPED_MESSAGE: &str = "No reference image, continuing with the product image";

/// Runs the four zones in order and reports every transition.
///
/// Zone N+1 never starts before zone N completed or was skipped. The first
/// failure halts the run; no later zone is invoked.
pub struct PipelineOrchestrator {
    ctx: RunnerContext,
    sink: Arc<dyn ProgressSink>,
    research: MarketResearchRunner,
    product: ProductImageRunner,
    composite: CompositeImageRunner,
    video: VideoRunner,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("ctx", &self.ctx)
            .field("video", &self.video)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator publishing to `sink`.
    #[must_use]
    pub fn new(ctx: RunnerContext, sink: Arc<dyn ProgressSink>, video: VideoRunner) -> Self {
        Self {
            ctx,
            sink,
            research: MarketResearchRunner,
            product: ProductImageRunner,
            composite: CompositeImageRunner,
            video,
        }
    }

    /// Executes a run to completion or first failure.
    pub async fn run(&self, request: &PipelineRequest) -> PipelineResult {
        let span = run_span(&request.task_id, &request.keyword);
        async {
            let mut result = PipelineResult::new(&request.task_id);

            if let Err(failure) = self.run_zones(request, &mut result).await {
                warn!(zone = %failure.zone, error = %failure.error, "Run halted");
                let event = StageEvent::failed(&request.task_id, failure.zone, &failure.message);
                self.emit(&mut result, event).await;
                result.failure = Some(failure);
            } else {
                info!(final_video = ?result.final_video_url(), "Run completed");
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run_zones(
        &self,
        request: &PipelineRequest,
        result: &mut PipelineResult,
    ) -> Result<(), ZoneFailure> {
        let task_id = request.task_id.as_str();

        let research_input = ResearchInput {
            keyword: request.keyword.clone(),
        };
        let metadata = self.run_zone(result, &self.research, &research_input).await?;
        result.metadata = Some(metadata.clone());
        let event = StageEvent::completed(task_id, Zone::MarketResearch, completed_message(Zone::MarketResearch))
            .with_metadata(metadata.clone());
        self.emit(result, event).await;

        let product_input = ProductImageInput {
            product_description: metadata.product_description_or(&request.keyword).to_string(),
            style: request.style_prompt.clone(),
        };
        let product = self.run_zone(result, &self.product, &product_input).await?;
        result.product_image = Some(product.clone());
        let event = StageEvent::completed(task_id, Zone::ImageGeneration, completed_message(Zone::ImageGeneration))
            .with_output(&product.url);
        self.emit(result, event).await;

        let video_source = match self.usable_reference(request).await {
            Some(reference) => {
                let composite_input = CompositeInput {
                    reference,
                    product,
                    scene: metadata.scene_description_or(FALLBACK_COMPOSITE_SCENE).to_string(),
                };
                let composite = self.run_zone(result, &self.composite, &composite_input).await?;
                result.composite_image = Some(composite.clone());
                let event = StageEvent::completed(task_id, Zone::ImageSynthesis, completed_message(Zone::ImageSynthesis))
                    .with_output(&composite.url);
                self.emit(result, event).await;
                composite
            }
            None => {
                let event = StageEvent::skipped(task_id, Zone::ImageSynthesis, SKIPPED_MESSAGE)
                    .with_output(&product.url);
                self.emit(result, event).await;
                product
            }
        };

        let video_input = VideoInput {
            source: video_source,
            scene: metadata.scene_description_or(FALLBACK_VIDEO_SCENE).to_string(),
            camera_hint: request.video_hint.clone(),
        };
        let video = self.run_zone(result, &self.video, &video_input).await?;
        result.final_video = Some(video.clone());
        let event = StageEvent::completed(task_id, Zone::VideoGeneration, completed_message(Zone::VideoGeneration))
            .with_output(&video.url);
        self.emit(result, event).await;

        Ok(())
    }

    /// Emits the running event, then runs the zone inside its span.
    async fn run_zone<R: StageRunner>(
        &self,
        result: &mut PipelineResult,
        runner: &R,
        input: &R::Input,
    ) -> Result<R::Output, ZoneFailure> {
        let zone = runner.zone();
        let task_id = result.task_id.clone();
        self.emit(result, StageEvent::running(&task_id, zone, running_message(zone)))
            .await;

        let timer = ZoneTimer::start(zone);
        let outcome = runner
            .run(&self.ctx, &task_id, input)
            .instrument(zone_span(&task_id, zone))
            .await;
        info!(zone = %zone, elapsed_ms = timer.elapsed_ms(), ok = outcome.is_ok(), "Zone finished");

        outcome.map_err(|error| ZoneFailure::new(zone, error))
    }

    /// The reference image to composite with, if one was supplied and exists.
    async fn usable_reference(&self, request: &PipelineRequest) -> Option<PathBuf> {
        let path = request.reference_image.as_ref()?;
        if self.ctx.artifacts.exists(path).await {
            Some(path.clone())
        } else {
            warn!(path = %path.display(), "Reference image not found, skipping composite");
            None
        }
    }

    /// Records the transition on the result, then publishes it.
    async fn emit(&self, result: &mut PipelineResult, event: StageEvent) {
        result.records.insert(event.zone, event.to_record());
        self.sink.publish(event).await;
    }
}
