//! Artifact persistence.
//!
//! This module provides:
//! - The `ArtifactStore` trait zones persist their outputs through
//! - `FsArtifactStore`, writing `<taskId>_<role>.<ext>` files to disk

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ReelflowConfig;
use crate::core::{extension_for_mime, ArtifactLocator, ArtifactRole};
use crate::errors::Result;
use crate::remote::ImagePayload;

/// Stores and reads back the files a run produces.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists bytes for a task and role, overwriting any previous file.
    async fn persist(
        &self,
        task_id: &str,
        role: ArtifactRole,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ArtifactLocator>;

    /// Reads a previously persisted artifact.
    async fn load(&self, path: &Path) -> Result<Vec<u8>>;

    /// Returns true if an artifact exists at the path.
    async fn exists(&self, path: &Path) -> bool;

    /// Where the reference image for a task is stored.
    fn reference_path(&self, task_id: &str) -> PathBuf;

    /// Reads an image artifact, inferring its MIME type from the extension.
    async fn load_image(&self, path: &Path) -> Result<ImagePayload> {
        let data = self.load(path).await?;
        Ok(ImagePayload::new(data, mime_for_path(path)))
    }
}

/// Infers a MIME type from a file extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => "image/png",
    }
}

/// Filesystem-backed artifact store.
///
/// Reference images land in the assets directory, generated artifacts in
/// the outputs directory. Directories are created on first write.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    outputs_dir: PathBuf,
    assets_dir: PathBuf,
    url_prefix: String,
}

impl FsArtifactStore {
    /// Creates a store rooted at the given directories.
    #[must_use]
    pub fn new(outputs_dir: impl Into<PathBuf>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            outputs_dir: outputs_dir.into(),
            assets_dir: assets_dir.into(),
            url_prefix: "/outputs".to_string(),
        }
    }

    /// Creates a store from configuration.
    #[must_use]
    pub fn from_config(config: &ReelflowConfig) -> Self {
        Self::new(&config.outputs_dir, &config.assets_dir).with_url_prefix(&config.output_url_prefix)
    }

    /// Sets the public URL prefix.
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    fn dir_for(&self, role: ArtifactRole) -> &Path {
        match role {
            ArtifactRole::Reference => &self.assets_dir,
            ArtifactRole::Product | ArtifactRole::Synthesized | ArtifactRole::Final => {
                &self.outputs_dir
            }
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(
        &self,
        task_id: &str,
        role: ArtifactRole,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ArtifactLocator> {
        let dir = self.dir_for(role);
        tokio::fs::create_dir_all(dir).await?;

        let file_name = role.file_name(task_id, extension_for_mime(mime_type));
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        debug!(task_id, role = %role, path = %path.display(), size = bytes.len(), "Artifact written");

        Ok(ArtifactLocator {
            role,
            path,
            url: format!("{}/{file_name}", self.url_prefix),
            mime_type: mime_type.to_string(),
        })
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    fn reference_path(&self, task_id: &str) -> PathBuf {
        self.assets_dir
            .join(ArtifactRole::Reference.file_name(task_id, "png"))
    }
}
