//! Persistence gateways.
//!
//! The managers talk to storage only through [`UserStore`] and [`TaskStore`].
//! [`PgStore`] backs them with Postgres; [`MemoryStore`] keeps everything in
//! process memory for tests and for running without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskStatus, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user and returns it with its assigned id.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    /// Overwrites the stored user with the same id.
    async fn update_user(&self, user: &User) -> Result<(), AppError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a new task and returns it with its assigned id.
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError>;
    async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>, AppError>;
    /// Overwrites every column of the stored task with the same id.
    async fn update_task(&self, task: &Task) -> Result<(), AppError>;
    async fn delete_task(&self, id: i64) -> Result<(), AppError>;
    /// Returns one window of a user's tasks in id order, plus the number of
    /// tasks matching the filter before `offset`/`limit` are applied.
    async fn list_tasks_by_user(
        &self,
        user_id: i64,
        status: Option<TaskStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Task>, i64), AppError>;
}
