//! Zone 4: image-to-video generation with long polling.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{prompts, RunnerContext, StageRunner};
use crate::core::{ArtifactLocator, ArtifactRole, Zone};
use crate::errors::{ReelflowError, Result};
use crate::remote::{OperationHandle, OperationStatus, VideoEntry};

/// Input of the video zone.
#[derive(Debug, Clone)]
pub struct VideoInput {
    /// Composite image, or the product image when zone 3 was skipped.
    pub source: ArtifactLocator,
    /// Scene description.
    pub scene: String,
    /// Camera/motion directive.
    pub camera_hint: String,
}

/// Starts a video job, waits for it and stores `<taskId>_final.*`.
#[derive(Debug, Clone)]
pub struct VideoRunner {
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl Default for VideoRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            max_wait: Some(Duration::from_secs(20 * 60)),
        }
    }
}

impl VideoRunner {
    /// Creates a runner with the given poll interval and overall wait limit.
    #[must_use]
    pub fn new(poll_interval: Duration, max_wait: Option<Duration>) -> Self {
        Self {
            poll_interval,
            max_wait,
        }
    }

    /// Interval between status checks.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn wait_until_done(
        &self,
        ctx: &RunnerContext,
        task_id: &str,
        handle: &OperationHandle,
    ) -> Result<OperationStatus> {
        let backend = ctx.backend.as_ref();
        let started = Instant::now();
        let mut status = OperationStatus::pending(&handle.name);
        let mut checks = 0u32;

        while !status.done {
            if let Some(limit) = self.max_wait {
                if started.elapsed() >= limit {
                    return Err(ReelflowError::PollTimeout {
                        operation: handle.name.clone(),
                        waited_ms: elapsed_ms(started),
                    });
                }
            }

            tokio::time::sleep(self.poll_interval).await;
            checks += 1;

            match ctx
                .retry
                .execute("video_generation.poll", move || backend.poll_operation(handle))
                .await
            {
                Ok(next) => {
                    debug!(task_id, operation = %handle.name, checks, done = next.done, "Video job polled");
                    status = next;
                }
                Err(err @ ReelflowError::RetryExhausted { .. }) => {
                    warn!(task_id, checks, error = %err, "Video status check failed, polling again");
                }
                Err(err) => return Err(err),
            }
        }

        info!(task_id, checks, elapsed_ms = elapsed_ms(started), "Video job finished");
        Ok(status)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl StageRunner for VideoRunner {
    type Input = VideoInput;
    type Output = ArtifactLocator;

    fn zone(&self) -> Zone {
        Zone::VideoGeneration
    }

    async fn run(
        &self,
        ctx: &RunnerContext,
        task_id: &str,
        input: &VideoInput,
    ) -> Result<ArtifactLocator> {
        let image = ctx.artifacts.load_image(&input.source.path).await?;
        let prompt = prompts::video_prompt(&input.scene, &input.camera_hint);

        let backend = ctx.backend.as_ref();
        let (image_ref, prompt) = (&image, prompt.as_str());
        let handle = ctx
            .retry
            .execute("video_generation.start", move || backend.generate_video(image_ref, prompt))
            .await?;
        info!(task_id, operation = %handle.name, "Video job started");

        let status = self.wait_until_done(ctx, task_id, &handle).await?;

        let entries = match status.entries {
            Some(entries) if !entries.is_empty() => entries,
            Some(_) => return Err(ReelflowError::NoResultData("empty video list".to_string())),
            None => {
                let detail = status
                    .error
                    .map_or_else(|| "no result data".to_string(), |e| format!("API error: {e}"));
                return Err(ReelflowError::NoResultData(detail));
            }
        };

        let file = entries
            .iter()
            .find_map(VideoEntry::downloadable)
            .ok_or(ReelflowError::NoDownloadableArtifact)?;

        let bytes = ctx
            .retry
            .execute("video_generation.download", move || backend.download_video(file))
            .await?;
        let mime_type = file.mime_type.as_deref().unwrap_or("video/mp4");

        ctx.artifacts
            .persist(task_id, ArtifactRole::Final, &bytes, mime_type)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use crate::pipeline::{RetryConfig, RetryExecutor};
    use crate::testing::{BackendCall, MemoryArtifactStore, ScriptedBackend};
    use std::sync::Arc;

    async fn setup(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, RunnerContext, VideoInput) {
        let backend = Arc::new(backend);
        let store = Arc::new(MemoryArtifactStore::new());
        let source = store
            .persist("t1", ArtifactRole::Product, b"img", "image/png")
            .await
            .unwrap();
        let ctx = RunnerContext::new(
            backend.clone(),
            store,
            RetryExecutor::new(RetryConfig::new().with_base_delay_ms(1)),
        );
        let input = VideoInput {
            source,
            scene: "studio".into(),
            camera_hint: "orbit".into(),
        };
        (backend, ctx, input)
    }

    fn runner() -> VideoRunner {
        VideoRunner::new(Duration::from_secs(20), Some(Duration::from_secs(600)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_done_then_downloads() {
        let (backend, ctx, input) = setup(ScriptedBackend::new().with_polls_until_done(3)).await;

        let locator = runner().run(&ctx, "t1", &input).await.unwrap();

        assert_eq!(locator.url, "/outputs/t1_final.mp4");
        assert_eq!(backend.count(BackendCall::GenerateVideo), 1);
        assert_eq!(backend.count(BackendCall::PollOperation), 3);
        assert_eq!(backend.count(BackendCall::DownloadVideo), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_poll_is_swallowed() {
        let (backend, ctx, input) = setup(
            ScriptedBackend::new()
                .with_polls_until_done(1)
                .with_failures(BackendCall::PollOperation, 5),
        )
        .await;

        runner().run(&ctx, "t1", &input).await.unwrap();
        assert_eq!(backend.count(BackendCall::PollOperation), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_with_poll_timeout() {
        let (backend, ctx, input) = setup(ScriptedBackend::new().with_polls_until_done(u32::MAX)).await;
        let runner = VideoRunner::new(Duration::from_secs(20), Some(Duration::from_secs(60)));

        let err = runner.run(&ctx, "t1", &input).await.unwrap_err();

        assert!(matches!(err, ReelflowError::PollTimeout { .. }));
        assert_eq!(backend.count(BackendCall::PollOperation), 3);
        assert_eq!(backend.count(BackendCall::DownloadVideo), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_result_data() {
        let (_, ctx, input) = setup(ScriptedBackend::new().with_final_status(
            OperationStatus {
                name: "operations/x".into(),
                done: true,
                entries: None,
                error: Some("quota".into()),
            },
        ))
        .await;

        let err = runner().run(&ctx, "t1", &input).await.unwrap_err();
        assert!(matches!(&err, ReelflowError::NoResultData(detail) if detail.contains("quota")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_downloadable_entry() {
        let (backend, ctx, input) = setup(ScriptedBackend::new().with_final_status(
            OperationStatus::finished("operations/x", vec![VideoEntry::default()]),
        ))
        .await;

        let err = runner().run(&ctx, "t1", &input).await.unwrap_err();
        assert!(matches!(err, ReelflowError::NoDownloadableArtifact));
        assert_eq!(backend.count(BackendCall::DownloadVideo), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_list_is_no_result_data() {
        let (_, ctx, input) = setup(
            ScriptedBackend::new().with_final_status(OperationStatus::finished("operations/x", vec![])),
        )
        .await;

        let err = runner().run(&ctx, "t1", &input).await.unwrap_err();
        assert!(matches!(err, ReelflowError::NoResultData(_)));
    }
}
