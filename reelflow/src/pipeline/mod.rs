//! Pipeline sequencing and execution.
//!
//! This module provides:
//! - Bounded retry with exponential backoff
//! - Run requests and results
//! - The four-zone orchestrator
//! - The service accepting runs and answering status queries

mod integration_tests;
mod orchestrator;
mod request;
mod result;
mod retry;
mod service;

pub use orchestrator::PipelineOrchestrator;
pub use request::{generate_task_id, PipelineRequest, TASK_ID_LEN};
pub use result::{PipelineResult, ZoneFailure};
pub use retry::{BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision, RetryExecutor};
pub use service::{PipelineService, PipelineServiceBuilder, TaskHandle};
