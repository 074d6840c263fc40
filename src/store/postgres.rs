use async_trait::async_trait;
use sqlx::PgPool;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskStatus, User};

const USER_COLUMNS: &str = "id, username, password_hash, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, user_id, title, description, status, due_date, created_at, updated_at";

/// Postgres-backed store. The schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to run migrations: {}", e)))
    }
}

/// Count and page statements for listing one user's tasks. Parameters are the
/// user id, the status when filtered, then offset and limit.
fn list_queries(filter_by_status: bool) -> (String, String) {
    let mut condition = String::from("WHERE user_id = $1");
    if filter_by_status {
        condition.push_str(" AND status = $2");
    }

    let next_param = if filter_by_status { 3 } else { 2 };
    let count_sql = format!("SELECT COUNT(*) FROM tasks {}", condition);
    let page_sql = format!(
        "SELECT {} FROM tasks {} ORDER BY id ASC OFFSET ${} LIMIT ${}",
        TASK_COLUMNS,
        condition,
        next_param,
        next_param + 1
    );
    (count_sql, page_sql)
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Username already taken".into())
            } else {
                e.into()
            }
        })
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET username = $1, password_hash = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        let created = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (user_id, title, description, status, due_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn update_task(&self, task: &Task) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE tasks \
             SET user_id = $1, title = $2, description = $3, status = $4, due_date = $5, \
                 created_at = $6, updated_at = $7 \
             WHERE id = $8",
        )
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Task not found".into()));
        }
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_tasks_by_user(
        &self,
        user_id: i64,
        status: Option<TaskStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Task>, i64), AppError> {
        let (count_sql, sql) = list_queries(status.is_some());

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);
        if let Some(status) = status {
            count_query = count_query.bind(status);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let mut page_query = sqlx::query_as::<_, Task>(&sql).bind(user_id);
        if let Some(status) = status {
            page_query = page_query.bind(status);
        }
        let items = page_query
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_queries_number_parameters_in_bind_order() {
        let (count_sql, page_sql) = list_queries(true);
        assert_eq!(
            count_sql,
            "SELECT COUNT(*) FROM tasks WHERE user_id = $1 AND status = $2"
        );
        assert!(page_sql.ends_with(
            "WHERE user_id = $1 AND status = $2 ORDER BY id ASC OFFSET $3 LIMIT $4"
        ));

        let (count_sql, page_sql) = list_queries(false);
        assert_eq!(count_sql, "SELECT COUNT(*) FROM tasks WHERE user_id = $1");
        assert!(page_sql.ends_with(
            "WHERE user_id = $1 ORDER BY id ASC OFFSET $2 LIMIT $3"
        ));
    }
}
