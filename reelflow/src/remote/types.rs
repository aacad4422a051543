//! Canonical payload shapes exchanged with a generation backend.
//!
//! Backends translate their wire format into these types once, so zone
//! runners never deal with vendor-specific field names.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::{ReelflowError, Result};

/// Image bytes with their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
}

impl ImagePayload {
    /// Creates a payload.
    #[must_use]
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Creates a PNG payload.
    #[must_use]
    pub fn png(data: Vec<u8>) -> Self {
        Self::new(data, "image/png")
    }

    /// Decodes a base64 payload as returned inline by the backend.
    pub fn from_base64(encoded: &str, mime_type: impl Into<String>) -> Result<Self> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ReelflowError::malformed(format!("invalid base64 image data: {e}")))?;
        Ok(Self::new(data, mime_type))
    }

    /// Encodes the bytes as base64 for inline transport.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Returns true if the payload carries an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        !self.data.is_empty() && self.mime_type.starts_with("image/")
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Opaque reference to a remote long-running video job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    /// Operation name used for polling.
    pub name: String,
}

impl OperationHandle {
    /// Creates a handle.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A generated video file, either inline bytes or a download URI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoFile {
    /// Download URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Inline bytes.
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
    /// MIME type when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl VideoFile {
    /// Returns true if the file can be fetched.
    #[must_use]
    pub fn is_downloadable(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
            || self.uri.as_ref().is_some_and(|u| !u.is_empty())
    }
}

/// One entry of a video result list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoEntry {
    /// The video file, absent when the backend filtered the sample.
    pub video: Option<VideoFile>,
}

impl VideoEntry {
    /// Creates an entry carrying inline bytes.
    #[must_use]
    pub fn inline(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            video: Some(VideoFile {
                uri: None,
                data: Some(data),
                mime_type: Some(mime_type.into()),
            }),
        }
    }

    /// Creates an entry pointing at a URI.
    #[must_use]
    pub fn remote(uri: impl Into<String>) -> Self {
        Self {
            video: Some(VideoFile {
                uri: Some(uri.into()),
                data: None,
                mime_type: None,
            }),
        }
    }

    /// Returns the file when it is downloadable.
    #[must_use]
    pub fn downloadable(&self) -> Option<&VideoFile> {
        self.video.as_ref().filter(|v| v.is_downloadable())
    }
}

/// Status of a polled video operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationStatus {
    /// Operation name.
    pub name: String,
    /// Whether the operation finished.
    pub done: bool,
    /// Normalized result entries; `None` when the operation reported no result.
    pub entries: Option<Vec<VideoEntry>>,
    /// Error reported by the backend.
    pub error: Option<String>,
}

impl OperationStatus {
    /// A still-running status.
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A finished status with entries.
    #[must_use]
    pub fn finished(name: impl Into<String>, entries: Vec<VideoEntry>) -> Self {
        Self {
            name: name.into(),
            done: true,
            entries: Some(entries),
            error: None,
        }
    }

    /// Parses an operation resource, normalizing the result list.
    ///
    /// The result may sit under `response` or `result`, and the list under
    /// any of the names understood by [`normalize_video_entries`].
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        let name = value
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let done = value
            .get("done")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let error = value.get("error").filter(|e| !e.is_null()).map(|e| {
            e.get("message")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| e.to_string(), str::to_string)
        });
        let entries = value
            .get("response")
            .or_else(|| value.get("result"))
            .filter(|r| !r.is_null())
            .map(normalize_video_entries);

        Self {
            name,
            done,
            entries,
            error,
        }
    }
}

const VIDEO_LIST_KEYS: [&str; 5] = [
    "generated_videos",
    "generatedVideos",
    "videos",
    "generatedSamples",
    "generated_samples",
];

const NESTED_RESULT_KEYS: [&str; 2] = ["generateVideoResponse", "generate_video_response"];

/// Extracts the video list from a result object.
///
/// Accepts the list under any known field name, nested one level under a
/// `generateVideoResponse` wrapper, or a bare array. Returns an empty list
/// when nothing matches.
#[must_use]
pub fn normalize_video_entries(result: &serde_json::Value) -> Vec<VideoEntry> {
    if let Some(items) = result.as_array() {
        return items.iter().map(parse_entry).collect();
    }

    for key in VIDEO_LIST_KEYS {
        if let Some(items) = result.get(key).and_then(serde_json::Value::as_array) {
            if !items.is_empty() {
                return items.iter().map(parse_entry).collect();
            }
        }
    }

    NESTED_RESULT_KEYS
        .iter()
        .find_map(|key| result.get(*key))
        .map(normalize_video_entries)
        .unwrap_or_default()
}

fn parse_entry(item: &serde_json::Value) -> VideoEntry {
    let video = item.get("video").filter(|v| !v.is_null()).map(|v| {
        let data = str_field(v, &["videoBytes", "video_bytes", "bytesBase64Encoded"])
            .and_then(|encoded| STANDARD.decode(encoded.trim()).ok());

        VideoFile {
            uri: str_field(v, &["uri", "gcsUri"]),
            data,
            mime_type: str_field(v, &["mimeType", "mime_type"]),
        }
    });

    VideoEntry { video }
}

fn str_field(value: &serde_json::Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| value.get(*n).and_then(serde_json::Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_payload_base64() {
        let payload = ImagePayload::png(vec![0x89, b'P', b'N', b'G']);
        let decoded = ImagePayload::from_base64(&payload.to_base64(), "image/png").unwrap();
        assert_eq!(decoded, payload);
        assert!(decoded.is_image());

        let err = ImagePayload::from_base64("***", "image/png").unwrap_err();
        assert!(matches!(err, ReelflowError::MalformedResponse(_)));
    }

    #[test]
    fn test_normalize_snake_and_camel_names() {
        let snake = json!({"generated_videos": [{"video": {"uri": "https://x/1"}}]});
        let camel = json!({"videos": [{"video": {"uri": "https://x/2", "mimeType": "video/mp4"}}]});

        assert_eq!(normalize_video_entries(&snake), vec![VideoEntry::remote("https://x/1")]);
        let entries = normalize_video_entries(&camel);
        assert_eq!(entries[0].video.as_ref().unwrap().mime_type.as_deref(), Some("video/mp4"));
    }

    #[test]
    fn test_normalize_nested_samples_and_bare_list() {
        let nested = json!({
            "generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://x/3"}}]}
        });
        assert_eq!(normalize_video_entries(&nested).len(), 1);

        let bare = json!([{"video": null}, {"video": {"uri": "https://x/4"}}]);
        let entries = normalize_video_entries(&bare);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].downloadable().is_none());
        assert!(entries[1].downloadable().is_some());
    }

    #[test]
    fn test_normalize_inline_bytes() {
        let encoded = STANDARD.encode(b"mp4data");
        let value = json!({"videos": [{"video": {"videoBytes": encoded, "mimeType": "video/mp4"}}]});
        let entries = normalize_video_entries(&value);
        assert_eq!(entries[0].video.as_ref().unwrap().data.as_deref(), Some(&b"mp4data"[..]));
    }

    #[test]
    fn test_normalize_unknown_shape_is_empty() {
        assert!(normalize_video_entries(&json!({"something": 1})).is_empty());
    }

    #[test]
    fn test_operation_status_from_value() {
        let running = OperationStatus::from_value(&json!({"name": "operations/1"}));
        assert!(!running.done);
        assert!(running.entries.is_none());

        let done = OperationStatus::from_value(&json!({
            "name": "operations/1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "u"}}]}}
        }));
        assert!(done.done);
        assert_eq!(done.entries.unwrap().len(), 1);

        let failed = OperationStatus::from_value(&json!({
            "name": "operations/1",
            "done": true,
            "error": {"code": 3, "message": "prompt blocked by safety"}
        }));
        assert_eq!(failed.error.as_deref(), Some("prompt blocked by safety"));
        assert!(failed.entries.is_none());
    }
}
