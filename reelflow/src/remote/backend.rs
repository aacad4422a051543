//! The capability surface a generation backend provides.

use async_trait::async_trait;

use super::types::{ImagePayload, OperationHandle, OperationStatus, VideoFile};
use crate::errors::Result;

/// Remote generation capabilities used by the four zones.
///
/// Implementations must be safe to share across concurrent runs. Transport
/// failures worth retrying should surface as `TransientRemote`; requests the
/// remote refuses outright as `RemoteRejected`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Runs a text analysis prompt and returns the structured JSON answer.
    async fn analyze(&self, prompt: &str) -> Result<serde_json::Value>;

    /// Generates an image from a prompt. `None` when the answer has no image.
    async fn generate_image(&self, prompt: &str) -> Result<Option<ImagePayload>>;

    /// Composes two images guided by a prompt. `None` when the answer has no image.
    async fn composite_images(
        &self,
        first: &ImagePayload,
        second: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<ImagePayload>>;

    /// Starts an image-to-video job.
    async fn generate_video(&self, image: &ImagePayload, prompt: &str) -> Result<OperationHandle>;

    /// Fetches the current status of a video job.
    async fn poll_operation(&self, handle: &OperationHandle) -> Result<OperationStatus>;

    /// Downloads a finished video.
    async fn download_video(&self, file: &VideoFile) -> Result<Vec<u8>>;
}
