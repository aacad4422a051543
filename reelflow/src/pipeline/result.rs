//! Outcome of one run.

use std::collections::HashMap;

use crate::core::{ArtifactLocator, ProductMetadata, StageRecord, Zone, ZoneStatus};
use crate::errors::{enrich_failure_message, ReelflowError};

/// The zone that halted a run and why.
#[derive(Debug)]
pub struct ZoneFailure {
    /// Zone that was running.
    pub zone: Zone,
    /// User-facing message, enriched with a hint when one applies.
    pub message: String,
    /// Underlying error.
    pub error: ReelflowError,
}

impl ZoneFailure {
    /// Wraps an error raised while `zone` was running.
    #[must_use]
    pub fn new(zone: Zone, error: ReelflowError) -> Self {
        Self {
            zone,
            message: enrich_failure_message(&error),
            error,
        }
    }
}

impl std::fmt::Display for ZoneFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.zone, self.message)
    }
}

/// Everything a run produced, owned by the orchestrator invocation.
#[derive(Debug)]
pub struct PipelineResult {
    /// Task identifier.
    pub task_id: String,
    /// Zone 1 output.
    pub metadata: Option<ProductMetadata>,
    /// Zone 2 output.
    pub product_image: Option<ArtifactLocator>,
    /// Zone 3 output; `None` when the zone was skipped.
    pub composite_image: Option<ArtifactLocator>,
    /// Zone 4 output.
    pub final_video: Option<ArtifactLocator>,
    /// Latest record per zone.
    pub records: HashMap<Zone, StageRecord>,
    /// Set when a zone failed.
    pub failure: Option<ZoneFailure>,
}

impl PipelineResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            metadata: None,
            product_image: None,
            composite_image: None,
            final_video: None,
            records: HashMap::new(),
            failure: None,
        }
    }

    /// Returns true if every zone completed or was skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
            && Zone::ALL
                .iter()
                .all(|zone| self.zone_status(*zone).is_done())
    }

    /// Status of a zone in this run.
    #[must_use]
    pub fn zone_status(&self, zone: Zone) -> ZoneStatus {
        self.records
            .get(&zone)
            .map_or(ZoneStatus::Pending, |record| record.status)
    }

    /// Public locator of the final video.
    #[must_use]
    pub fn final_video_url(&self) -> Option<&str> {
        self.final_video.as_ref().map(|locator| locator.url.as_str())
    }
}
