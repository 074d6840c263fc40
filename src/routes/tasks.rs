use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{TaskInput, TaskQuery, TaskUpdate},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

fn parse_task_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid task id".into()))
}

/// Retrieves one page of the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `status` (optional): `todo`, `in_progress` or `done`. Empty lists every status.
/// - `page` (optional): 1-based page number, defaults to 1.
/// - `page_size` (optional): defaults to 10, capped at 100.
///
/// ## Responses:
/// - `200 OK`: `{items, total, page, page_size}` where `total` counts every matching task.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `422 Unprocessable Entity`: If `status` names an unknown status.
#[get("")]
pub async fn list_tasks(
    state: web::Data<AppState>,
    query: web::Query<TaskQuery>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    let page = state
        .tasks
        .list(user.id(), query.status.as_deref(), query.page, query.page_size)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Creates a new task for the authenticated user.
///
/// ## Request Body:
/// - `title`: 1 to 100 characters.
/// - `description` (optional): at most 500 characters.
/// - `due_date` (optional): any supported date format, e.g. `2025-03-05`,
///   `2025/03/05`, `03/05/2025` or a Unix timestamp.
///
/// ## Responses:
/// - `201 Created`: Returns the new `Task` with status `todo`.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `422 Unprocessable Entity`: If a field fails validation or the due date cannot be parsed.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<TaskInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.create(user.id(), task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task`.
/// - `400 Bad Request`: If the id is not a number.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<String>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    let task = state.tasks.get(task_id, user.id()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task owned by the authenticated user.
///
/// Only non-empty fields are applied. A `status` that is not one of
/// `todo`, `in_progress` or `done` is ignored.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task`.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
/// - `422 Unprocessable Entity`: If a supplied field fails validation.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<String>,
    changes: web::Json<TaskUpdate>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    let task = state
        .tasks
        .update(task_id, user.id(), changes.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task owned by the authenticated user.
///
/// ## Responses:
/// - `204 No Content`: The task was deleted.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<String>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    state.tasks.delete(task_id, user.id()).await?;
    Ok(HttpResponse::NoContent().finish())
}
