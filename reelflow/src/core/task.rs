//! Per-task progress state and its read-only snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{PipelineStage, ProductMetadata, StageEvent, StageRecord, Zone, ZoneStatus};

/// Progress percentages a task can report.
pub const PROGRESS_STEPS: [u8; 5] = [0, 25, 50, 75, 100];

/// One pipeline run as seen by status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub task_id: String,
    /// Derived overall stage.
    pub stage: PipelineStage,
    /// Share of zones completed or skipped, 0 to 100.
    pub progress: u8,
    /// Records of zones that have reported at least once.
    pub records: HashMap<Zone, StageRecord>,
    /// Locator of the final video once zone 4 completes.
    pub final_video_url: Option<String>,
    /// Research result once zone 1 completes.
    pub metadata: Option<ProductMetadata>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an idle task with every zone pending.
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            stage: PipelineStage::Idle,
            progress: 0,
            records: HashMap::new(),
            final_video_url: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current status of a zone.
    #[must_use]
    pub fn zone_status(&self, zone: Zone) -> ZoneStatus {
        self.records
            .get(&zone)
            .map_or(ZoneStatus::Pending, |record| record.status)
    }

    /// Applies a stage event. Returns false when the event was ignored.
    ///
    /// Events are ignored once the task reached a terminal stage, when they
    /// would move the zone's status backwards, and when they skip a zone
    /// other than image synthesis.
    pub fn apply(&mut self, event: &StageEvent) -> bool {
        if self.stage.is_terminal() || !self.zone_status(event.zone).can_advance_to(event.status) {
            return false;
        }
        if event.status == ZoneStatus::Skipped && event.zone != Zone::ImageSynthesis {
            return false;
        }

        self.records.insert(event.zone, event.to_record());
        if let Some(metadata) = &event.metadata {
            self.metadata = Some(metadata.clone());
        }

        match event.status {
            ZoneStatus::Running => self.stage = event.zone.pipeline_stage(),
            ZoneStatus::Failed => self.stage = PipelineStage::Failed,
            ZoneStatus::Completed if event.zone == Zone::VideoGeneration => {
                self.stage = PipelineStage::Completed;
                self.final_video_url.clone_from(&event.output_url);
            }
            ZoneStatus::Pending | ZoneStatus::Completed | ZoneStatus::Skipped => {}
        }

        self.progress = self.compute_progress();
        self.updated_at = event.timestamp;
        true
    }

    fn compute_progress(&self) -> u8 {
        let done = self.records.values().filter(|r| r.status.is_done()).count();
        // done <= 4, so the quotient fits
        u8::try_from(done * 100 / Zone::COUNT).unwrap_or(100)
    }

    /// Read-only snapshot with zones in execution order.
    #[must_use]
    pub fn snapshot(&self) -> TaskStatus {
        TaskStatus {
            task_id: self.task_id.clone(),
            stage: self.stage,
            progress: self.progress,
            zones: Zone::ALL
                .iter()
                .map(|zone| {
                    self.records
                        .get(zone)
                        .cloned()
                        .unwrap_or_else(|| StageRecord::pending(*zone))
                })
                .collect(),
            final_video_url: self.final_video_url.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Task identifier.
    pub task_id: String,
    /// Derived overall stage.
    pub stage: PipelineStage,
    /// Progress, one of 0, 25, 50, 75, 100.
    pub progress: u8,
    /// One record per zone, in execution order.
    pub zones: Vec<StageRecord>,
    /// Locator of the final video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_video_url: Option<String>,
    /// Research result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProductMetadata>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    /// Record of one zone, if the snapshot carries it.
    #[must_use]
    pub fn zone(&self, zone: Zone) -> Option<&StageRecord> {
        self.zones.iter().find(|record| record.zone == zone)
    }

    /// Status of one zone; a zone missing from the snapshot reads as pending.
    #[must_use]
    pub fn zone_status(&self, zone: Zone) -> ZoneStatus {
        self.zone(zone).map_or(ZoneStatus::Pending, |record| record.status)
    }

    /// Returns true once the task completed or failed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }
}
