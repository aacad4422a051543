//! Structured research result produced by zone 1.

use serde::{Deserialize, Serialize};

use crate::errors::{ReelflowError, Result};

/// Marketing metadata returned by the research zone.
///
/// The six named fields are the requested schema; anything else the model
/// returns is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductMetadata {
    /// Video title.
    pub title: String,
    /// SEO description.
    pub description: String,
    /// Hashtag list.
    pub tags: Vec<String>,
    /// Short trend summary.
    pub trend_summary: String,
    /// Product description used for image generation.
    #[serde(default)]
    pub product_description: String,
    /// Scene description used for compositing and video.
    #[serde(default)]
    pub scene_description: String,
    /// Additional fields returned by the model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProductMetadata {
    /// Parses the research payload, failing with `MalformedResponse` when it
    /// does not match the schema.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| ReelflowError::malformed(format!("research payload: {e}")))
    }

    /// Product description, or `fallback` when the model left it empty.
    #[must_use]
    pub fn product_description_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_empty_or(&self.product_description, fallback)
    }

    /// Scene description, or `fallback` when the model left it empty.
    #[must_use]
    pub fn scene_description_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_empty_or(&self.scene_description, fallback)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
