//! The four fixed pipeline zones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::PipelineStage;
use crate::errors::ReelflowError;

/// One of the four fixed stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Zone 1: keyword research producing structured metadata.
    MarketResearch,
    /// Zone 2: product image generation.
    ImageGeneration,
    /// Zone 3: reference image + product image composite (skippable).
    ImageSynthesis,
    /// Zone 4: image-to-video generation with long polling.
    VideoGeneration,
}

impl Zone {
    /// All zones in execution order.
    pub const ALL: [Self; 4] = [
        Self::MarketResearch,
        Self::ImageGeneration,
        Self::ImageSynthesis,
        Self::VideoGeneration,
    ];

    /// Number of zones in a run.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the wire name of the zone.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarketResearch => "market_research",
            Self::ImageGeneration => "image_generation",
            Self::ImageSynthesis => "image_synthesis",
            Self::VideoGeneration => "video_generation",
        }
    }

    /// Zero-based position in the execution order.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::MarketResearch => 0,
            Self::ImageGeneration => 1,
            Self::ImageSynthesis => 2,
            Self::VideoGeneration => 3,
        }
    }

    /// The zone that runs after this one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The overall stage a task reports while this zone is running.
    #[must_use]
    pub fn pipeline_stage(self) -> PipelineStage {
        match self {
            Self::MarketResearch => PipelineStage::MarketResearch,
            Self::ImageGeneration => PipelineStage::ImageGeneration,
            Self::ImageSynthesis => PipelineStage::ImageSynthesis,
            Self::VideoGeneration => PipelineStage::VideoGeneration,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = ReelflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|zone| zone.as_str() == s)
            .ok_or_else(|| ReelflowError::Serialization(format!("unknown zone '{s}'")))
    }
}
