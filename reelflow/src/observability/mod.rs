//! Observability utilities.
//!
//! This module provides:
//! - Subscriber setup with text or JSON output and `RUST_LOG` filtering
//! - Per-run and per-zone spans
//! - A timer for zone durations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_subscriber::EnvFilter;

use crate::core::Zone;
use crate::errors::{ReelflowError, Result};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,reelflow=debug";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ReelflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ReelflowError::configuration(format!("unknown log format '{other}'"))),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling it again once a
/// subscriber is installed leaves the existing one in place. Fails with
/// `Configuration` when `default_filter` does not parse.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> Result<()> {
    let fallback = EnvFilter::try_new(default_filter)
        .map_err(|e| ReelflowError::configuration(format!("invalid log filter '{default_filter}': {e}")))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or(fallback);
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = installed {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
    Ok(())
}

/// Span wrapping one pipeline run.
#[must_use]
pub fn run_span(task_id: &str, keyword: &str) -> Span {
    info_span!("pipeline_run", task_id, keyword)
}

/// Span wrapping one zone of a run.
#[must_use]
pub fn zone_span(task_id: &str, zone: Zone) -> Span {
    info_span!("zone", task_id, zone = zone.as_str())
}

/// Measures how long a zone took.
#[derive(Debug)]
pub struct ZoneTimer {
    start: Instant,
    zone: Zone,
}

impl ZoneTimer {
    /// Starts timing a zone.
    #[must_use]
    pub fn start(zone: Zone) -> Self {
        Self {
            start: Instant::now(),
            zone,
        }
    }

    /// The zone being timed.
    #[must_use]
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Elapsed milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
