pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::error::AppError;

/// Registers the routes mounted under `/api`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(users::register)
            .service(users::login)
            .service(users::change_password)
            .service(users::me),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::list_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}

/// JSON body settings: malformed payloads become `400` responses in the
/// application's error format.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| {
            AppError::BadRequest(format!("Invalid request body: {}", err)).into()
        })
}

/// Query string settings matching `json_config`.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| {
            AppError::BadRequest(format!("Invalid query string: {}", err)).into()
        })
}
