//! Per-zone outcome snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Zone, ZoneStatus};

/// Status, message and output of one zone within one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// The zone this record describes.
    pub zone: Zone,
    /// Current zone status.
    pub status: ZoneStatus,
    /// Human-readable message.
    pub message: String,
    /// Locator of the produced artifact, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl StageRecord {
    /// Creates the placeholder record reported for a zone that has not started.
    #[must_use]
    pub fn pending(zone: Zone) -> Self {
        Self {
            zone,
            status: ZoneStatus::Pending,
            message: "waiting".to_string(),
            output_url: None,
            updated_at: Utc::now(),
        }
    }
}
