use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskStatus, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

/// In-process store with the same contract as the Postgres one.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already taken".into()));
        }
        tables.next_user_id += 1;
        let id = tables.next_user_id;
        let user = User::from_new(id, user);
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        match self.tables.write().await.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("User not found".into())),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        let mut tables = self.tables.write().await;
        tables.next_task_id += 1;
        let id = tables.next_task_id;
        let task = Task::from_new(id, task);
        tables.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>, AppError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn update_task(&self, task: &Task) -> Result<(), AppError> {
        match self.tables.write().await.tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Task not found".into())),
        }
    }

    async fn delete_task(&self, id: i64) -> Result<(), AppError> {
        self.tables.write().await.tasks.remove(&id);
        Ok(())
    }

    async fn list_tasks_by_user(
        &self,
        user_id: i64,
        status: Option<TaskStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Task>, i64), AppError> {
        let tables = self.tables.read().await;
        let matching: Vec<&Task> = tables
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && status.map_or(true, |s| t.status == s))
            .collect();

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }
}
