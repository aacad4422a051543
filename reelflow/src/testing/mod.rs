//! Testing utilities for reelflow pipelines.
//!
//! This module provides:
//! - A scripted generation backend with failure injection
//! - An in-memory artifact store
//! - Assertions over task status and event order

mod artifacts;
mod assertions;
mod backend;

pub use artifacts::MemoryArtifactStore;
pub use assertions::{assert_events_ordered, assert_progress_monotonic, assert_zone_statuses};
pub use backend::{sample_analysis, BackendCall, ScriptedBackend, TINY_PNG};
