//! Run submission parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Length of generated task identifiers.
pub const TASK_ID_LEN: usize = 8;

/// Generates a short task identifier from a random UUID.
#[must_use]
pub fn generate_task_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(TASK_ID_LEN);
    id
}

/// Everything one run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Task identifier.
    pub task_id: String,
    /// Product keyword.
    pub keyword: String,
    /// Style directive; empty means the configured default.
    #[serde(default)]
    pub style_prompt: String,
    /// Camera/motion directive; empty means the configured default.
    #[serde(default)]
    pub video_hint: String,
    /// Reference image for the composite zone.
    #[serde(default)]
    pub reference_image: Option<PathBuf>,
}

impl PipelineRequest {
    /// Creates a request with a generated task id.
    #[must_use]
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            task_id: generate_task_id(),
            keyword: keyword.into(),
            style_prompt: String::new(),
            video_hint: String::new(),
            reference_image: None,
        }
    }

    /// Uses a caller-chosen task id.
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    /// Sets the style directive.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style_prompt = style.into();
        self
    }

    /// Sets the camera/motion directive.
    #[must_use]
    pub fn with_video_hint(mut self, hint: impl Into<String>) -> Self {
        self.video_hint = hint.into();
        self
    }

    /// Attaches a reference image.
    #[must_use]
    pub fn with_reference_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_image = Some(path.into());
        self
    }

    /// Fills empty directives with the given defaults.
    #[must_use]
    pub fn with_defaults(mut self, style: &str, hint: &str) -> Self {
        if self.style_prompt.trim().is_empty() {
            self.style_prompt = style.to_string();
        }
        if self.video_hint.trim().is_empty() {
            self.video_hint = hint.to_string();
        }
        self
    }
}
