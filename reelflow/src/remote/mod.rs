//! Remote generation backends.
//!
//! This module provides:
//! - The `GenerationBackend` capability trait
//! - Canonical payload types and video-result normalization
//! - A REST adapter for the Gemini / Veo APIs (feature `http-backend`)

mod backend;
#[cfg(feature = "http-backend")]
mod gemini;
mod types;

pub use backend::GenerationBackend;
#[cfg(feature = "http-backend")]
pub use gemini::GeminiBackend;
pub use types::{
    normalize_video_entries, ImagePayload, OperationHandle, OperationStatus, VideoEntry,
    VideoFile,
};
