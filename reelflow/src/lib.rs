//! # Reelflow
//!
//! A four-zone product video pipeline.
//!
//! Given a product keyword and an optional reference image, a run:
//!
//! - **Researches** the keyword into structured marketing metadata
//! - **Generates** a product image
//! - **Composites** the reference subject with the product (skipped without a reference)
//! - **Renders** a vertical video from the image, waiting on a long-running job
//!
//! Every remote call goes through a bounded retry executor. Each zone
//! transition is published as a typed event; the progress tracker turns
//! those events into per-task status that callers poll.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reelflow::prelude::*;
//!
//! let service = PipelineService::from_env()?;
//! let handle = service.submit(PipelineRequest::new("Espresso Machine")).await?;
//!
//! let status = service.status(handle.task_id()).await?;
//! println!("{} {}%", status.stage, status.progress);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod remote;
pub mod stages;
pub mod store;
pub mod testing;
pub mod tracker;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifacts::{ArtifactStore, FsArtifactStore};
    pub use crate::config::ReelflowConfig;
    pub use crate::core::{
        ArtifactLocator, ArtifactRole, PipelineStage, ProductMetadata, StageEvent, StageRecord,
        TaskStatus, Zone, ZoneStatus,
    };
    pub use crate::errors::{ReelflowError, Result};
    pub use crate::events::{LoggingProgressSink, NoOpProgressSink, ProgressSink};
    pub use crate::pipeline::{
        PipelineRequest, PipelineResult, PipelineService, RetryConfig, RetryExecutor, TaskHandle,
    };
    pub use crate::remote::GenerationBackend;
    pub use crate::store::{InMemoryTaskStore, TaskStore};
    pub use crate::tracker::TaskProgressTracker;
}
