use chrono::{DateTime, Utc};
use std::sync::Arc;
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    validate_schedule, CreateTaskRequest, NewTask, Task, TaskCategory, TaskChanges, TaskStatus,
    UpdateTaskRequest,
};
use crate::store::TaskStore;

/// Task CRUD with date-derived status.
#[derive(Clone)]
pub struct TaskManager {
    tasks: Arc<dyn TaskStore>,
}

fn parse_category(raw: &str) -> Result<TaskCategory, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown category {}.", raw)))
}

fn parse_status(raw: &str) -> Result<TaskStatus, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown status {}.", raw)))
}

impl TaskManager {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// Every new task starts as `Pending`, whatever status the caller sent.
    pub async fn create(&self, request: CreateTaskRequest) -> Result<Task, AppError> {
        request.validate()?;
        let (start, end) = validate_schedule(request.start, request.end, Utc::now())?;

        let task = self
            .tasks
            .insert(NewTask {
                category: parse_category(&request.category)?,
                title: request.title,
                description: request.description,
                status: TaskStatus::Pending,
                start,
                end,
                user_id: request.user_id,
            })
            .await?;
        log::info!("created task {} for user {}", task.id, task.user_id);
        Ok(task)
    }

    pub async fn find_all(&self) -> Result<Vec<Task>, AppError> {
        self.find_all_at(Utc::now()).await
    }

    /// All tasks with their status as displayed at `now`. The stored status is left alone.
    pub async fn find_all_at(&self, now: DateTime<Utc>) -> Result<Vec<Task>, AppError> {
        let mut tasks = self.tasks.find_all().await?;
        for task in tasks.iter_mut() {
            task.status = task.status_at(now);
        }
        Ok(tasks)
    }

    pub async fn find_one(&self, id: i32) -> Result<Task, AppError> {
        self.tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task with id {} not found.", id)))
    }

    /// Patching either date re-checks the whole window, so both must be sent together.
    pub async fn update(&self, id: i32, patch: UpdateTaskRequest) -> Result<Task, AppError> {
        patch.validate()?;
        self.find_one(id).await?;

        let (start, end) = if patch.start.is_some() || patch.end.is_some() {
            let (start, end) = validate_schedule(patch.start, patch.end, Utc::now())?;
            (Some(start), Some(end))
        } else {
            (None, None)
        };

        let changes = TaskChanges {
            title: patch.title,
            category: patch.category.as_deref().map(parse_category).transpose()?,
            description: patch.description,
            status: patch.status.as_deref().map(parse_status).transpose()?,
            start,
            end,
        };
        let task = self.tasks.update(id, changes).await?;
        log::info!("updated task {}", id);
        Ok(task)
    }

    pub async fn remove(&self, id: i32) -> Result<&'static str, AppError> {
        self.find_one(id).await?;
        self.tasks.delete(id).await?;
        log::info!("removed task {}", id);
        Ok("success")
    }
}
