//! Typed stage-transition events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProductMetadata, StageRecord, Zone, ZoneStatus};

/// A zone transition emitted by the orchestrator.
///
/// Events for one task are delivered in zone order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// Task the event belongs to.
    pub task_id: String,
    /// Zone that changed.
    pub zone: Zone,
    /// New zone status.
    pub status: ZoneStatus,
    /// Human-readable message.
    pub message: String,
    /// Locator of the produced artifact, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    /// Structured research result, attached to the zone-1 completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProductMetadata>,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

impl StageEvent {
    /// Creates a new stage event.
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        zone: Zone,
        status: ZoneStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            zone,
            status,
            message: message.into(),
            output_url: None,
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a "running" event.
    #[must_use]
    pub fn running(task_id: &str, zone: Zone, message: impl Into<String>) -> Self {
        Self::new(task_id, zone, ZoneStatus::Running, message)
    }

    /// Creates a "completed" event.
    #[must_use]
    pub fn completed(task_id: &str, zone: Zone, message: impl Into<String>) -> Self {
        Self::new(task_id, zone, ZoneStatus::Completed, message)
    }

    /// Creates a "skipped" event.
    #[must_use]
    pub fn skipped(task_id: &str, zone: Zone, message: impl Into<String>) -> Self {
        Self::new(task_id, zone, ZoneStatus::Skipped, message)
    }

    /// Creates a "failed" event.
    #[must_use]
    pub fn failed(task_id: &str, zone: Zone, message: impl Into<String>) -> Self {
        Self::new(task_id, zone, ZoneStatus::Failed, message)
    }

    /// Attaches an output locator.
    #[must_use]
    pub fn with_output(mut self, url: impl Into<String>) -> Self {
        self.output_url = Some(url.into());
        self
    }

    /// Attaches research metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ProductMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Converts the event into the stage record it describes.
    #[must_use]
    pub fn to_record(&self) -> StageRecord {
        StageRecord {
            zone: self.zone,
            status: self.status,
            message: self.message.clone(),
            output_url: self.output_url.clone(),
            updated_at: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let event = StageEvent::completed("t1", Zone::ImageGeneration, "done")
            .with_output("/outputs/t1_product.png");

        assert_eq!(event.task_id, "t1");
        assert_eq!(event.status, ZoneStatus::Completed);
        assert_eq!(event.output_url.as_deref(), Some("/outputs/t1_product.png"));

        let record = event.to_record();
        assert_eq!(record.zone, Zone::ImageGeneration);
        assert_eq!(record.message, "done");
        assert_eq!(record.updated_at, event.timestamp);
    }

    #[test]
    fn test_event_serialization_skips_empty_fields() {
        let event = StageEvent::running("t1", Zone::MarketResearch, "researching");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["zone"], "market_research");
        assert_eq!(json["status"], "running");
        assert!(json.get("output_url").is_none());
        assert!(json.get("metadata").is_none());
    }
}
