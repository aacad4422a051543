//! Scripted generation backend for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::{ReelflowError, Result};
use crate::remote::{
    GenerationBackend, ImagePayload, OperationHandle, OperationStatus, VideoEntry, VideoFile,
};

/// The backend capability a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    /// `analyze`
    Analyze,
    /// `generate_image`
    GenerateImage,
    /// `composite_images`
    CompositeImages,
    /// `generate_video`
    GenerateVideo,
    /// `poll_operation`
    PollOperation,
    /// `download_video`
    DownloadVideo,
}

/// A 1x1 transparent PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug)]
struct ScriptedFailure {
    remaining: u32,
    message: String,
}

/// A backend answering from a script and recording every call.
///
/// By default every capability succeeds: research returns a complete
/// metadata object, images are tiny PNGs, and the video job finishes on
/// the first poll with one inline MP4 entry.
#[derive(Debug)]
pub struct ScriptedBackend {
    analysis: Value,
    produce_images: bool,
    polls_until_done: u32,
    final_status: Option<OperationStatus>,
    latency: Option<Duration>,
    failures: Mutex<HashMap<BackendCall, ScriptedFailure>>,
    successful_polls: Mutex<u32>,
    calls: Mutex<Vec<(BackendCall, String)>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// Creates a backend where every capability succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            analysis: sample_analysis(),
            produce_images: true,
            polls_until_done: 1,
            final_status: None,
            latency: None,
            failures: Mutex::new(HashMap::new()),
            successful_polls: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the research answer.
    #[must_use]
    pub fn with_analysis(mut self, analysis: Value) -> Self {
        self.analysis = analysis;
        self
    }

    /// Makes image capabilities answer without an image.
    #[must_use]
    pub fn without_images(mut self) -> Self {
        self.produce_images = false;
        self
    }

    /// Makes the first `count` calls to a capability fail transiently.
    #[must_use]
    pub fn with_failures(self, call: BackendCall, count: u32) -> Self {
        self.with_failure_message(call, count, format!("scripted {call:?} failure"))
    }

    /// Like [`Self::with_failures`] with a custom error message.
    #[must_use]
    pub fn with_failure_message(self, call: BackendCall, count: u32, message: impl Into<String>) -> Self {
        self.failures.lock().insert(
            call,
            ScriptedFailure {
                remaining: count,
                message: message.into(),
            },
        );
        self
    }

    /// The video job reports done on the n-th successful poll.
    #[must_use]
    pub fn with_polls_until_done(mut self, polls: u32) -> Self {
        self.polls_until_done = polls;
        self
    }

    /// Sets the status returned once the video job is done.
    #[must_use]
    pub fn with_final_status(mut self, status: OperationStatus) -> Self {
        self.final_status = Some(status);
        self
    }

    /// Delays every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of calls made to a capability.
    #[must_use]
    pub fn count(&self, call: BackendCall) -> usize {
        self.calls.lock().iter().filter(|(c, _)| *c == call).count()
    }

    /// Prompts or details recorded for a capability, in call order.
    #[must_use]
    pub fn prompts(&self, call: BackendCall) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(c, _)| *c == call)
            .map(|(_, detail)| detail.clone())
            .collect()
    }

    /// Every recorded call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().iter().map(|(c, _)| *c).collect()
    }

    async fn enter(&self, call: BackendCall, detail: &str) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().push((call, detail.to_string()));

        let mut failures = self.failures.lock();
        match failures.get_mut(&call) {
            Some(failure) if failure.remaining > 0 => {
                failure.remaining -= 1;
                Err(ReelflowError::transient(failure.message.clone()))
            }
            _ => Ok(()),
        }
    }

    fn image(&self) -> Option<ImagePayload> {
        self.produce_images.then(|| ImagePayload::png(TINY_PNG.to_vec()))
    }
}

/// A complete research answer.
#[must_use]
pub fn sample_analysis() -> Value {
    json!({
        "title": "Morning ritual, upgraded",
        "description": "Barista-grade espresso at home.",
        "tags": ["espresso", "coffee", "kitchen", "barista", "morning"],
        "trend_summary": "Home espresso keeps growing.",
        "product_description": "A brushed steel espresso machine with a chrome portafilter",
        "scene_description": "Sunlit kitchen counter with steam rising from a cup"
    })
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn analyze(&self, prompt: &str) -> Result<Value> {
        self.enter(BackendCall::Analyze, prompt).await?;
        Ok(self.analysis.clone())
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<ImagePayload>> {
        self.enter(BackendCall::GenerateImage, prompt).await?;
        Ok(self.image())
    }

    async fn composite_images(
        &self,
        _first: &ImagePayload,
        _second: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<ImagePayload>> {
        self.enter(BackendCall::CompositeImages, prompt).await?;
        Ok(self.image())
    }

    async fn generate_video(&self, _image: &ImagePayload, prompt: &str) -> Result<OperationHandle> {
        self.enter(BackendCall::GenerateVideo, prompt).await?;
        Ok(OperationHandle::new("operations/scripted-video"))
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        self.enter(BackendCall::PollOperation, &handle.name).await?;

        let mut polls = self.successful_polls.lock();
        *polls = polls.saturating_add(1);
        if *polls < self.polls_until_done {
            return Ok(OperationStatus::pending(&handle.name));
        }

        Ok(self.final_status.clone().unwrap_or_else(|| {
            OperationStatus::finished(&handle.name, vec![VideoEntry::inline(b"mp4".to_vec(), "video/mp4")])
        }))
    }

    async fn download_video(&self, file: &VideoFile) -> Result<Vec<u8>> {
        self.enter(BackendCall::DownloadVideo, file.uri.as_deref().unwrap_or("inline"))
            .await?;
        file.data
            .clone()
            .or_else(|| file.uri.as_ref().map(|_| b"remote-mp4".to_vec()))
            .ok_or(ReelflowError::NoDownloadableArtifact)
    }
}
