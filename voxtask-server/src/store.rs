use crate::errors::{ApiError, ServerResult};
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;
use voxtask_core::models::{Task, TaskFormData, TaskUpdate};

/// In-memory task storage, partitioned by owner.
///
/// Each owner's list keeps creation order. With a quota set, creates beyond
/// it are refused with `ApiError::Forbidden`, which clients treat as a
/// policy rejection.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: DashMap<String, Vec<Task>>,
    quota: Option<usize>,
}

impl TaskStore {
    pub fn new(quota: Option<usize>) -> Self {
        Self {
            tasks: DashMap::new(),
            quota,
        }
    }

    pub fn list(&self, owner: &str) -> Vec<Task> {
        self.tasks
            .get(owner)
            .map(|tasks| tasks.clone())
            .unwrap_or_default()
    }

    pub fn create(&self, owner: &str, data: &TaskFormData) -> ServerResult<Task> {
        let mut tasks = self.tasks.entry(owner.to_string()).or_default();
        if let Some(quota) = self.quota {
            if tasks.len() >= quota {
                return Err(ApiError::quota_exceeded().into());
            }
        }

        let mut task = Task::from_form(Uuid::new_v4().to_string(), data, Utc::now());
        task.owner_id = Some(owner.to_string());
        tasks.push(task.clone());
        Ok(task)
    }

    pub fn update(&self, owner: &str, id: &str, update: &TaskUpdate) -> ServerResult<Task> {
        let mut tasks = self
            .tasks
            .get_mut(owner)
            .ok_or_else(ApiError::task_not_found)?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(ApiError::task_not_found)?;
        task.apply_update(update);
        Ok(task.clone())
    }

    pub fn delete(&self, owner: &str, id: &str) -> ServerResult<()> {
        let mut tasks = self
            .tasks
            .get_mut(owner)
            .ok_or_else(ApiError::task_not_found)?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(ApiError::task_not_found().into());
        }
        Ok(())
    }

    pub fn count(&self, owner: &str) -> usize {
        self.tasks.get(owner).map(|tasks| tasks.len()).unwrap_or(0)
    }
}
