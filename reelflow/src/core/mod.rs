//! Core domain model types for reelflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The fixed zone topology
//! - Zone status and overall pipeline stage enums
//! - Stage records, transition events, artifacts and research metadata
//! - The per-task progress record and its status snapshot

mod artifact;
mod event;
mod metadata;
mod record;
mod status;
mod task;
mod zone;

pub use artifact::{extension_for_mime, ArtifactLocator, ArtifactRole};
pub use event::StageEvent;
pub use metadata::ProductMetadata;
pub use record::StageRecord;
pub use status::{PipelineStage, ZoneStatus};
pub use task::{Task, TaskStatus, PROGRESS_STEPS};
pub use zone::Zone;
