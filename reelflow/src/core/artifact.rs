//! Artifact roles and locators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The role an artifact plays in a run; determines its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    /// Reference image uploaded by the caller.
    Reference,
    /// Zone 2 product image.
    Product,
    /// Zone 3 composite image.
    Synthesized,
    /// Zone 4 video.
    Final,
}

impl ArtifactRole {
    /// Suffix used in `<taskId>_<suffix>.<ext>`.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Reference => "character",
            Self::Product => "product",
            Self::Synthesized => "synthesized",
            Self::Final => "final",
        }
    }

    /// Deterministic file name for a task.
    #[must_use]
    pub fn file_name(self, task_id: &str, extension: &str) -> String {
        format!("{task_id}_{}.{extension}", self.suffix())
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Where a persisted artifact lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocator {
    /// Role of the artifact.
    pub role: ArtifactRole,
    /// Storage path used to read the artifact back.
    pub path: PathBuf,
    /// Public locator reported to clients.
    pub url: String,
    /// MIME type of the stored bytes.
    pub mime_type: String,
}

/// Maps a MIME type to the file extension used for storage.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        m if m.starts_with("video/") => "mp4",
        _ => "png",
    }
}
