//! Zone runners.
//!
//! Each runner executes one zone: it builds the zone's request from prior
//! outputs, invokes the backend through the [`RetryExecutor`], validates the
//! answer and persists the produced artifact. A runner never continues past
//! its own failure.

mod composite;
mod product;
pub mod prompts;
mod research;
mod video;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::core::Zone;
use crate::errors::Result;
use crate::pipeline::RetryExecutor;
use crate::remote::GenerationBackend;

pub use composite::{CompositeImageRunner, CompositeInput};
pub use product::{ProductImageInput, ProductImageRunner};
pub use research::{MarketResearchRunner, ResearchInput};
pub use video::{VideoInput, VideoRunner};

/// Shared collaborators handed to every runner.
#[derive(Clone)]
pub struct RunnerContext {
    /// Remote generation capabilities.
    pub backend: Arc<dyn GenerationBackend>,
    /// Artifact persistence.
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Retry policy for every remote call.
    pub retry: RetryExecutor,
}

impl Debug for RunnerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerContext")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RunnerContext {
    /// Creates a runner context.
    #[must_use]
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            backend,
            artifacts,
            retry,
        }
    }
}

/// Executes one zone of a run.
#[async_trait]
pub trait StageRunner: Send + Sync + Debug {
    /// What the zone consumes.
    type Input: Send + Sync;
    /// What the zone produces.
    type Output: Send;

    /// The zone this runner implements.
    fn zone(&self) -> Zone;

    /// Runs the zone for a task.
    async fn run(
        &self,
        ctx: &RunnerContext,
        task_id: &str,
        input: &Self::Input,
    ) -> Result<Self::Output>;
}
