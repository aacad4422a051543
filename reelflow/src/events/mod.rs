//! Progress event delivery.
//!
//! This module provides:
//! - The `ProgressSink` trait the orchestrator publishes stage events to
//! - Logging, collecting, fan-out and channel-backed sinks

mod channel;
mod sink;

pub use channel::{ChannelProgressSink, DeliveryMetrics};
pub use sink::{
    CollectingProgressSink, FanoutProgressSink, LoggingProgressSink, NoOpProgressSink,
    ProgressSink,
};
