//! Task handles and the store used to look them up for cancellation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: Uuid,
    pub abort_requested: bool,
    pub created_at: DateTime<Utc>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self {
            task_id: Uuid::new_v4(),
            abort_requested: false,
            created_at: Utc::now(),
        }
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortOutcome {
    Aborted,
    NotFound,
}

/// Registry of in-flight runs keyed by task id.
pub trait TaskStore: Send + Sync {
    fn put(&self, handle: TaskHandle);

    fn get(&self, task_id: &Uuid) -> Option<TaskHandle>;

    fn delete(&self, task_id: &Uuid) -> Option<TaskHandle>;

    /// Flag the task for cancellation. Idempotent; unknown ids report `NotFound`.
    fn request_abort(&self, task_id: &Uuid) -> AbortOutcome;

    fn is_abort_requested(&self, task_id: &Uuid) -> bool {
        self.get(task_id).map(|h| h.abort_requested).unwrap_or(false)
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<Uuid, TaskHandle>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn put(&self, handle: TaskHandle) {
        self.tasks.lock().insert(handle.task_id, handle);
    }

    fn get(&self, task_id: &Uuid) -> Option<TaskHandle> {
        self.tasks.lock().get(task_id).cloned()
    }

    fn delete(&self, task_id: &Uuid) -> Option<TaskHandle> {
        self.tasks.lock().remove(task_id)
    }

    fn request_abort(&self, task_id: &Uuid) -> AbortOutcome {
        match self.tasks.lock().get_mut(task_id) {
            Some(handle) => {
                handle.abort_requested = true;
                AbortOutcome::Aborted
            }
            None => AbortOutcome::NotFound,
        }
    }

    fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}
