//! Submission and status entry points.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use super::{PipelineOrchestrator, PipelineRequest, PipelineResult, RetryExecutor};
use crate::artifacts::{ArtifactStore, FsArtifactStore};
use crate::config::ReelflowConfig;
use crate::core::{ArtifactRole, TaskStatus};
use crate::errors::{ReelflowError, Result};
use crate::events::{FanoutProgressSink, ProgressSink};
use crate::remote::GenerationBackend;
use crate::stages::{RunnerContext, VideoRunner};
use crate::store::{InMemoryTaskStore, TaskStore};
use crate::tracker::TaskProgressTracker;

/// A submitted run.
#[derive(Debug)]
pub struct TaskHandle {
    task_id: String,
    handle: JoinHandle<PipelineResult>,
}

impl TaskHandle {
    /// Identifier of the run.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Waits for the run to finish.
    pub async fn wait(self) -> Result<PipelineResult> {
        self.handle
            .await
            .map_err(|e| ReelflowError::Internal(format!("run {} aborted: {e}", self.task_id)))
    }

    /// Waits for several runs, returning their outcomes in submission order.
    pub async fn wait_all(handles: Vec<Self>) -> Vec<Result<PipelineResult>> {
        futures::future::join_all(handles.into_iter().map(Self::wait)).await
    }
}

/// Builder for [`PipelineService`].
#[derive(Default)]
pub struct PipelineServiceBuilder {
    config: ReelflowConfig,
    backend: Option<Arc<dyn GenerationBackend>>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    store: Option<Arc<dyn TaskStore>>,
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl PipelineServiceBuilder {
    /// Starts from a configuration.
    #[must_use]
    pub fn new(config: ReelflowConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Uses the given backend instead of the HTTP one.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Uses the given artifact store instead of the filesystem one.
    #[must_use]
    pub fn artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Uses the given task store instead of the in-memory one.
    #[must_use]
    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Adds a sink that receives every event after the tracker.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builds the service.
    ///
    /// Without an explicit backend this needs the `http-backend` feature and
    /// an API key in the configuration.
    pub fn build(self) -> Result<PipelineService> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => default_backend(&self.config)?,
        };
        let artifacts = self
            .artifacts
            .unwrap_or_else(|| Arc::new(FsArtifactStore::from_config(&self.config)));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let tracker = TaskProgressTracker::new(store);

        let sink = self
            .sinks
            .into_iter()
            .fold(FanoutProgressSink::new().with_sink(Arc::new(tracker.clone())), |fanout, sink| {
                fanout.with_sink(sink)
            });

        let ctx = RunnerContext::new(
            backend,
            artifacts.clone(),
            RetryExecutor::new(self.config.retry.clone()),
        );
        let video = VideoRunner::new(self.config.poll_interval(), self.config.max_video_wait());
        let orchestrator = PipelineOrchestrator::new(ctx, Arc::new(sink), video);

        Ok(PipelineService {
            orchestrator: Arc::new(orchestrator),
            tracker,
            artifacts,
            default_style: self.config.default_style_prompt,
            default_video_hint: self.config.default_video_hint,
        })
    }
}

#[cfg(feature = "http-backend")]
fn default_backend(config: &ReelflowConfig) -> Result<Arc<dyn GenerationBackend>> {
    Ok(Arc::new(crate::remote::GeminiBackend::new(config)?))
}

#[cfg(not(feature = "http-backend"))]
fn default_backend(_config: &ReelflowConfig) -> Result<Arc<dyn GenerationBackend>> {
    Err(ReelflowError::configuration(
        "no generation backend supplied and the http-backend feature is disabled",
    ))
}

/// Accepts runs, executes them in the background and answers status queries.
#[derive(Clone)]
pub struct PipelineService {
    orchestrator: Arc<PipelineOrchestrator>,
    tracker: TaskProgressTracker,
    artifacts: Arc<dyn ArtifactStore>,
    default_style: String,
    default_video_hint: String,
}

impl std::fmt::Debug for PipelineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineService")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl PipelineService {
    /// Starts a builder.
    #[must_use]
    pub fn builder(config: ReelflowConfig) -> PipelineServiceBuilder {
        PipelineServiceBuilder::new(config)
    }

    /// Builds a service from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::builder(ReelflowConfig::from_env()?).build()
    }

    /// The tracker answering status queries.
    #[must_use]
    pub fn tracker(&self) -> &TaskProgressTracker {
        &self.tracker
    }

    /// Registers the task and starts its run in the background.
    ///
    /// Returns as soon as the task is registered. Fails with `DuplicateTask`
    /// if the identifier is taken.
    pub async fn submit(&self, request: PipelineRequest) -> Result<TaskHandle> {
        let request = request.with_defaults(&self.default_style, &self.default_video_hint);
        self.tracker.register(&request.task_id).await?;
        info!(
            task_id = %request.task_id,
            keyword = %request.keyword,
            reference = request.reference_image.is_some(),
            "Run submitted"
        );

        let task_id = request.task_id.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move { orchestrator.run(&request).await });

        Ok(TaskHandle { task_id, handle })
    }

    /// Submits a run and waits for it to finish.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineResult> {
        self.submit(request).await?.wait().await
    }

    /// Status of a task, or `None` if it is unknown.
    pub async fn get_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.tracker.status(task_id).await
    }

    /// Status of a task, failing with `TaskNotFound` if it is unknown.
    pub async fn status(&self, task_id: &str) -> Result<TaskStatus> {
        self.tracker.require_status(task_id).await
    }

    /// Stores an uploaded reference image for a task and returns its path.
    pub async fn stage_reference_image(&self, task_id: &str, bytes: &[u8]) -> Result<PathBuf> {
        let locator = self
            .artifacts
            .persist(task_id, ArtifactRole::Reference, bytes, "image/png")
            .await?;
        Ok(locator.path)
    }
}
