//! Task record storage.
//!
//! This module provides:
//! - The `TaskStore` key-value abstraction over task records
//! - `InMemoryTaskStore`, a sharded concurrent map

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::Task;
use crate::errors::{ReelflowError, Result};

/// Keyed storage of task records.
///
/// Writers for different task identifiers must not interfere; no ordering
/// is required across identifiers.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns a copy of the task.
    async fn get(&self, task_id: &str) -> Option<Task>;

    /// Inserts a new task, failing with `DuplicateTask` if the id exists.
    async fn insert(&self, task: Task) -> Result<()>;

    /// Inserts or replaces a task.
    async fn put(&self, task: Task);

    /// Mutates a task in place. Returns `None` if the task is unknown,
    /// otherwise what `apply` returned.
    async fn update(
        &self,
        task_id: &str,
        apply: &(dyn for<'t> Fn(&'t mut Task) -> bool + Send + Sync + '_),
    ) -> Option<bool>;

    /// Returns all task identifiers.
    async fn task_ids(&self) -> Vec<String>;
}

/// In-memory task store; state does not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<String, Task>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.get(task_id).map(|entry| entry.value().clone())
    }

    async fn insert(&self, task: Task) -> Result<()> {
        match self.tasks.entry(task.task_id.clone()) {
            Entry::Occupied(entry) => Err(ReelflowError::DuplicateTask(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(task);
                Ok(())
            }
        }
    }

    async fn put(&self, task: Task) {
        self.tasks.insert(task.task_id.clone(), task);
    }

    async fn update(
        &self,
        task_id: &str,
        apply: &(dyn for<'t> Fn(&'t mut Task) -> bool + Send + Sync + '_),
    ) -> Option<bool> {
        self.tasks.get_mut(task_id).map(|mut entry| apply(entry.value_mut()))
    }

    async fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = InMemoryTaskStore::new();
        store.insert(Task::new("t1")).await.unwrap();

        let err = store.insert(Task::new("t1")).await.unwrap_err();
        assert!(matches!(err, ReelflowError::DuplicateTask(id) if id == "t1"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_returns_none() {
        let store = InMemoryTaskStore::new();
        assert_eq!(store.update("missing", &|_| true).await, None);
    }

    #[tokio::test]
    async fn test_update_mutates_in_place() {
        let store = InMemoryTaskStore::new();
        store.put(Task::new("t1")).await;

        let changed = store
            .update("t1", &|task| {
                task.progress = 50;
                true
            })
            .await;

        assert_eq!(changed, Some(true));
        assert_eq!(store.get("t1").await.unwrap().progress, 50);
        assert_eq!(store.task_ids().await, vec!["t1".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_on_distinct_tasks() {
        let store = std::sync::Arc::new(InMemoryTaskStore::new());
        for i in 0..16 {
            store.put(Task::new(format!("t{i}"))).await;
        }

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    for _ in 0..4 {
                        store
                            .update(&format!("t{i}"), &|task| {
                                task.progress += 25;
                                true
                            })
                            .await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..16 {
            assert_eq!(store.get(&format!("t{i}")).await.unwrap().progress, 100);
        }
    }
}
