//! Zone status and overall pipeline stage enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status of one zone within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    /// Zone has not started.
    #[default]
    Pending,
    /// Zone is executing.
    Running,
    /// Zone produced its output.
    Completed,
    /// Zone was bypassed; its input passes through unchanged.
    Skipped,
    /// Zone failed and halted the run.
    Failed,
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl ZoneStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }

    /// Returns true if the zone counts toward progress.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Completed | Self::Skipped | Self::Failed => 2,
        }
    }

    /// Returns true if moving from `self` to `next` moves forward.
    ///
    /// Statuses never regress, and a terminal status is final.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

/// The derived overall stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Submitted, no zone started yet.
    #[default]
    Idle,
    /// Zone 1 running.
    MarketResearch,
    /// Zone 2 running.
    ImageGeneration,
    /// Zone 3 running.
    ImageSynthesis,
    /// Zone 4 running.
    VideoGeneration,
    /// Zone 4 completed.
    Completed,
    /// Some zone failed.
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::MarketResearch => "market_research",
            Self::ImageGeneration => "image_generation",
            Self::ImageSynthesis => "image_synthesis",
            Self::VideoGeneration => "video_generation",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl PipelineStage {
    /// Returns true once the task can no longer change stage.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
