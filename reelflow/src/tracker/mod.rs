//! Task progress tracking.
//!
//! The tracker turns stage events into task records held in a
//! [`TaskStore`]. It is the only writer of task state.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::core::{StageEvent, Task, TaskStatus};
use crate::errors::{ReelflowError, Result};
use crate::events::ProgressSink;
use crate::store::{InMemoryTaskStore, TaskStore};

/// Maintains per-task zone records, progress and overall stage.
#[derive(Clone)]
pub struct TaskProgressTracker {
    store: Arc<dyn TaskStore>,
}

impl std::fmt::Debug for TaskProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskProgressTracker").finish_non_exhaustive()
    }
}

impl Default for TaskProgressTracker {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryTaskStore::new()))
    }
}

impl TaskProgressTracker {
    /// Creates a tracker over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Registers a new idle task with every zone pending.
    pub async fn register(&self, task_id: &str) -> Result<()> {
        self.store.insert(Task::new(task_id)).await?;
        debug!(task_id, "Task registered");
        Ok(())
    }

    /// Applies a stage event to its task.
    ///
    /// Unknown task ids and events that would regress state are ignored.
    pub async fn on_stage_event(&self, event: &StageEvent) {
        match self.store.update(&event.task_id, &|task| task.apply(event)).await {
            None => trace!(task_id = %event.task_id, zone = %event.zone, "Event for unknown task ignored"),
            Some(false) => trace!(
                task_id = %event.task_id,
                zone = %event.zone,
                status = %event.status,
                "Stale event ignored"
            ),
            Some(true) => {}
        }
    }

    /// Snapshot of a task, or `None` if it is unknown.
    pub async fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.store.get(task_id).await.map(|task| task.snapshot())
    }

    /// Snapshot of a task, failing with `TaskNotFound` if it is unknown.
    pub async fn require_status(&self, task_id: &str) -> Result<TaskStatus> {
        self.status(task_id)
            .await
            .ok_or_else(|| ReelflowError::TaskNotFound(task_id.to_string()))
    }
}

#[async_trait]
impl ProgressSink for TaskProgressTracker {
    async fn publish(&self, event: StageEvent) {
        self.on_stage_event(&event).await;
    }
}
