//! End-to-end tests for pipeline runs.

#[cfg(test)]
mod tests {
    use crate::core::{PipelineStage, StageEvent, Zone, ZoneStatus};
    use crate::errors::ReelflowError;
    use crate::events::{CollectingProgressSink, ProgressSink};
    use crate::pipeline::{PipelineRequest, PipelineService, TaskHandle};
    use crate::config::ReelflowConfig;
    use crate::testing::{
        assert_events_ordered, assert_progress_monotonic, assert_zone_statuses, BackendCall,
        MemoryArtifactStore, ScriptedBackend,
    };
    use crate::tracker::TaskProgressTracker;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    /// Reads the tracker after every event it sees.
    struct ProgressProbe {
        tracker: Mutex<Option<TaskProgressTracker>>,
        observed: Mutex<Vec<u8>>,
    }

    #[async_trait]
    impl ProgressSink for ProgressProbe {
        async fn publish(&self, event: StageEvent) {
            let tracker = self.tracker.lock().clone();
            if let Some(tracker) = tracker {
                if let Some(status) = tracker.status(&event.task_id).await {
                    self.observed.lock().push(status.progress);
                }
            }
        }
    }

    struct Harness {
        service: PipelineService,
        backend: Arc<ScriptedBackend>,
        artifacts: Arc<MemoryArtifactStore>,
        events: Arc<CollectingProgressSink>,
        probe: Arc<ProgressProbe>,
    }

    fn harness(backend: ScriptedBackend) -> Harness {
        let backend = Arc::new(backend);
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let events = Arc::new(CollectingProgressSink::new());
        let probe = Arc::new(ProgressProbe {
            tracker: Mutex::new(None),
            observed: Mutex::new(Vec::new()),
        });

        let service = PipelineService::builder(ReelflowConfig::new("test-key"))
            .backend(backend.clone())
            .artifacts(artifacts.clone())
            .sink(events.clone())
            .sink(probe.clone())
            .build()
            .unwrap();
        *probe.tracker.lock() = Some(service.tracker().clone());

        Harness {
            service,
            backend,
            artifacts,
            events,
            probe,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_reference_skips_composite() {
        let h = harness(ScriptedBackend::new());

        let request = PipelineRequest::new("Espresso Machine").with_task_id("T1");
        let result = h.service.run(request).await.unwrap();
        assert!(result.is_success());

        let status = h.service.status("T1").await.unwrap();
        assert_zone_statuses(
            &status,
            [ZoneStatus::Completed, ZoneStatus::Completed, ZoneStatus::Skipped, ZoneStatus::Completed],
        );
        assert_eq!(status.stage, PipelineStage::Completed);
        assert_eq!(status.progress, 100);
        assert_eq!(status.final_video_url.as_deref(), Some("/outputs/T1_final.mp4"));
        assert_eq!(
            status.zone(Zone::ImageSynthesis).unwrap().output_url.as_deref(),
            Some("/outputs/T1_product.png")
        );
        assert!(status.metadata.is_some());

        assert_eq!(h.backend.count(BackendCall::CompositeImages), 0);
        assert_eq!(h.backend.count(BackendCall::DownloadVideo), 1);

        let events = h.events.events_for("T1");
        assert_events_ordered(&events);
        let statuses: Vec<_> = events.iter().map(|e| (e.zone, e.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (Zone::MarketResearch, ZoneStatus::Running),
                (Zone::MarketResearch, ZoneStatus::Completed),
                (Zone::ImageGeneration, ZoneStatus::Running),
                (Zone::ImageGeneration, ZoneStatus::Completed),
                (Zone::ImageSynthesis, ZoneStatus::Skipped),
                (Zone::VideoGeneration, ZoneStatus::Running),
                (Zone::VideoGeneration, ZoneStatus::Completed),
            ]
        );

        let observed = h.probe.observed.lock().clone();
        assert_progress_monotonic(&observed);
        assert_eq!(observed.last(), Some(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_product_image_halts_run() {
        let h = harness(ScriptedBackend::new().without_images());

        let result = h
            .service
            .run(PipelineRequest::new("Espresso Machine").with_task_id("T2"))
            .await
            .unwrap();

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.zone, Zone::ImageGeneration);
        assert!(matches!(failure.error.root_cause(), ReelflowError::NoArtifactProduced(_)));

        let status = h.service.status("T2").await.unwrap();
        assert_eq!(status.stage, PipelineStage::Failed);
        assert_eq!(status.progress, 25);
        assert_zone_statuses(
            &status,
            [ZoneStatus::Completed, ZoneStatus::Failed, ZoneStatus::Pending, ZoneStatus::Pending],
        );
        assert_eq!(status.zone(Zone::ImageGeneration).unwrap().message, failure.message);

        assert_eq!(h.backend.count(BackendCall::GenerateImage), 5);
        assert_eq!(h.backend.count(BackendCall::CompositeImages), 0);
        assert_eq!(h.backend.count(BackendCall::GenerateVideo), 0);
        assert!(status.final_video_url.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_reference_composites() {
        let h = harness(ScriptedBackend::new());
        let reference = h.service.stage_reference_image("T3", b"face").await.unwrap();
        assert!(h.artifacts.contains(&reference));

        let request = PipelineRequest::new("Espresso Machine")
            .with_task_id("T3")
            .with_reference_image(reference);
        h.service.run(request).await.unwrap();

        let status = h.service.status("T3").await.unwrap();
        assert_zone_statuses(&status, [ZoneStatus::Completed; 4]);
        assert_eq!(
            status.zone(Zone::ImageSynthesis).unwrap().output_url.as_deref(),
            Some("/outputs/T3_synthesized.png")
        );
        assert_eq!(h.backend.count(BackendCall::CompositeImages), 1);
        assert!(h.backend.prompts(BackendCall::CompositeImages)[0].contains("Sunlit kitchen counter"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_reference_file_skips_composite() {
        let h = harness(ScriptedBackend::new());

        let request = PipelineRequest::new("Desk Lamp")
            .with_task_id("T4")
            .with_reference_image("assets/nowhere.png");
        h.service.run(request).await.unwrap();

        let status = h.service.status("T4").await.unwrap();
        assert_eq!(status.zone_status(Zone::ImageSynthesis), ZoneStatus::Skipped);
        assert_eq!(h.backend.count(BackendCall::CompositeImages), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_absorbed() {
        let h = harness(
            ScriptedBackend::new()
                .with_failures(BackendCall::Analyze, 2)
                .with_failures(BackendCall::GenerateImage, 4),
        );

        let result = h
            .service
            .run(PipelineRequest::new("Headphones").with_task_id("T5"))
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(h.backend.count(BackendCall::Analyze), 3);
        assert_eq!(h.backend.count(BackendCall::GenerateImage), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_failure_message_has_hint() {
        let h = harness(ScriptedBackend::new().with_failure_message(
            BackendCall::Analyze,
            u32::MAX,
            "HTTP 429: RESOURCE_EXHAUSTED",
        ));

        h.service
            .run(PipelineRequest::new("Sneakers").with_task_id("T6"))
            .await
            .unwrap();

        let status = h.service.status("T6").await.unwrap();
        let record = status.zone(Zone::MarketResearch).unwrap();
        assert_eq!(record.status, ZoneStatus::Failed);
        assert!(record.message.contains("429"));
        assert!(record.message.ends_with("(Quota exceeded, wait a moment and try again.)"));
        assert_eq!(status.progress, 0);
        assert_eq!(h.backend.count(BackendCall::GenerateImage), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_and_duplicate_tasks() {
        let h = harness(ScriptedBackend::new());

        assert!(h.service.get_status("missing").await.is_none());
        assert!(matches!(
            h.service.status("missing").await,
            Err(ReelflowError::TaskNotFound(_))
        ));

        let first = h
            .service
            .submit(PipelineRequest::new("Kettle").with_task_id("dup"))
            .await
            .unwrap();
        let second = h
            .service
            .submit(PipelineRequest::new("Kettle").with_task_id("dup"))
            .await;
        assert!(matches!(second, Err(ReelflowError::DuplicateTask(_))));
        first.wait().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_before_completion() {
        let h = harness(ScriptedBackend::new().with_latency(Duration::from_secs(5)));

        let handle = h
            .service
            .submit(PipelineRequest::new("Blender").with_task_id("T7"))
            .await
            .unwrap();

        let status = h.service.status("T7").await.unwrap();
        assert!(!status.is_finished());
        assert!(status.progress < 100);

        handle.wait().await.unwrap();
        assert!(h.service.status("T7").await.unwrap().is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_events_do_not_unfail() {
        let h = harness(ScriptedBackend::new().without_images());
        h.service
            .run(PipelineRequest::new("Mug").with_task_id("T8"))
            .await
            .unwrap();

        h.service
            .tracker()
            .on_stage_event(&StageEvent::completed("T8", Zone::VideoGeneration, "late").with_output("/x"))
            .await;

        let status = h.service.status("T8").await.unwrap();
        assert_eq!(status.stage, PipelineStage::Failed);
        assert!(status.final_video_url.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_do_not_collide() {
        let h = harness(ScriptedBackend::new().with_latency(Duration::from_millis(250)));

        let mut handles = Vec::new();
        for i in 0..8 {
            let request = PipelineRequest::new(format!("Product {i}")).with_task_id(format!("c{i}"));
            handles.push(h.service.submit(request).await.unwrap());
        }
        let results = TaskHandle::wait_all(handles).await;

        for (i, result) in results.into_iter().enumerate() {
            let result = result.unwrap();
            assert!(result.is_success());
            assert_eq!(result.final_video_url(), Some(format!("/outputs/c{i}_final.mp4").as_str()));
            assert_eq!(h.service.status(&format!("c{i}")).await.unwrap().progress, 100);
        }
        assert_eq!(h.backend.count(BackendCall::GenerateVideo), 8);
    }
}
