use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use validator::Validate;

use crate::dates::parse_due_date;
use crate::error::AppError;
use crate::models::{NewTask, Task, TaskInput, TaskPage, TaskStatus, TaskUpdate};
use crate::store::TaskStore;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Task operations scoped to the owning user.
///
/// Every operation on an existing task loads it first and compares its
/// `user_id` with the caller; a task owned by someone else yields
/// `AppError::AccessDenied`, a missing one `AppError::NotFound`.
#[derive(Clone)]
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
}

impl TaskManager {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner_id: i64, input: TaskInput) -> Result<Task, AppError> {
        input.validate()?;
        let due_date = match input.due_date.as_deref() {
            Some(text) => parse_due_date(text)?,
            None => None,
        };

        let now = Utc::now();
        let task = self
            .store
            .create_task(NewTask {
                user_id: owner_id,
                title: input.title,
                description: input.description.filter(|d| !d.is_empty()),
                status: TaskStatus::Todo,
                due_date,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("User {} created task {}", owner_id, task.id);
        Ok(task)
    }

    pub async fn get(&self, task_id: i64, owner_id: i64) -> Result<Task, AppError> {
        let task = self
            .store
            .get_task_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        if task.user_id != owner_id {
            warn!(
                "User {} attempted to access task {} owned by user {}",
                owner_id, task_id, task.user_id
            );
            return Err(AppError::AccessDenied("Task".into()));
        }
        Ok(task)
    }

    /// Applies the supplied fields to a task. Absent or empty fields keep the
    /// stored value; an unknown status is ignored.
    pub async fn update(
        &self,
        task_id: i64,
        owner_id: i64,
        changes: TaskUpdate,
    ) -> Result<Task, AppError> {
        changes.validate()?;
        let mut task = self.get(task_id, owner_id).await?;

        if let Some(title) = changes.title.filter(|t| !t.is_empty()) {
            task.title = title;
        }
        if let Some(description) = changes.description.filter(|d| !d.is_empty()) {
            task.description = Some(description);
        }

        if let Some(text) = changes.due_date.as_deref() {
            if let Some(due_date) = parse_due_date(text)? {
                task.due_date = Some(due_date);
            }
        }

        if let Some(status) = changes.status.as_deref().and_then(TaskStatus::parse) {
            task.status = status;
        }

        task.updated_at = Utc::now();
        self.store.update_task(&task).await?;
        Ok(task)
    }

    pub async fn delete(&self, task_id: i64, owner_id: i64) -> Result<(), AppError> {
        self.get(task_id, owner_id).await?;
        self.store.delete_task(task_id).await?;
        info!("User {} deleted task {}", owner_id, task_id);
        Ok(())
    }

    /// Lists one page of the owner's tasks in id order.
    ///
    /// Pages are 1-based. A page below 1 becomes 1, a page size below 1
    /// becomes [`DEFAULT_PAGE_SIZE`] and one above [`MAX_PAGE_SIZE`] is capped.
    pub async fn list(
        &self,
        owner_id: i64,
        status_filter: Option<&str>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<TaskPage, AppError> {
        let status = match status_filter.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Some(TaskStatus::parse(name).ok_or_else(|| {
                AppError::Validation(format!("status: unknown task status '{}'", name))
            })?),
            None => None,
        };

        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = match page_size {
            Some(size) if size > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            Some(size) if size >= 1 => size,
            _ => DEFAULT_PAGE_SIZE,
        };

        let offset = (page - 1).saturating_mul(page_size);
        let (items, total) = self
            .store
            .list_tasks_by_user(owner_id, status, offset, page_size)
            .await?;

        Ok(TaskPage {
            items,
            total,
            page,
            page_size,
        })
    }
}
