//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every manager operation returns exactly one `AppError` variant, and the variant decides
//! the HTTP response: validation failures, missing resources, ownership violations,
//! authentication failures and persistence failures are all distinct.
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can return it directly.
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `bcrypt::BcryptError`, `DateParseError` and `AuthError` allow conversion with `?`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::dates::DateParseError;

/// Authentication failures. Each token or credential problem has its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header on a protected route.
    #[error("missing authentication token")]
    MissingToken,
    /// The token is not a decodable JWT.
    #[error("token is malformed")]
    TokenMalformed,
    /// The current time is past the token's `exp`.
    #[error("token has expired")]
    TokenExpired,
    /// The current time is before the token's `nbf`.
    #[error("token is not valid yet")]
    TokenNotYetValid,
    /// Bad signature, wrong algorithm or issuer, or unreadable claims.
    #[error("token is invalid")]
    TokenInvalid,
    /// Login with a username that does not exist.
    #[error("user not found")]
    UserNotFound,
    /// Login or password change with the wrong password.
    #[error("invalid password")]
    InvalidPassword,
}

impl AuthError {
    /// The message sent to clients.
    ///
    /// Unknown users and wrong passwords share one message so a login response
    /// does not reveal which usernames exist.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::UserNotFound | AuthError::InvalidPassword => "Invalid credentials",
            AuthError::MissingToken => "Missing token",
            AuthError::TokenMalformed => "Malformed token",
            AuthError::TokenExpired => "Token has expired",
            AuthError::TokenNotYetValid => "Token is not valid yet",
            AuthError::TokenInvalid => "Invalid token",
        }
    }
}

/// Represents all possible errors that can occur within the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// A field failed validation (HTTP 422).
    #[error("Validation Error: {0}")]
    Validation(String),
    /// The request itself could not be interpreted (HTTP 400).
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// The requested resource does not exist (HTTP 404).
    #[error("Not Found: {0}")]
    NotFound(String),
    /// The resource exists but belongs to another user.
    /// Rendered exactly like `NotFound` so clients cannot probe for existence.
    #[error("Access Denied: {0} belongs to another user")]
    AccessDenied(String),
    /// The resource already exists (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Token or credential failure (HTTP 401).
    #[error("Unauthorized: {0}")]
    Auth(#[from] AuthError),
    /// The backing store failed (HTTP 500). Not retried.
    #[error("Database Error: {0}")]
    Persistence(String),
    /// Any other server-side failure, such as hashing or signing (HTTP 500).
    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::AccessDenied(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::AccessDenied(resource) => format!("{} not found", resource),
            AppError::Auth(err) => err.public_message().to_string(),
            AppError::Persistence(_) | AppError::Internal(_) => {
                log::error!("{}", self);
                "Internal server error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// `RowNotFound` becomes `NotFound`; every other database error is a persistence failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::Persistence(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(error.to_string())
    }
}

impl From<DateParseError> for AppError {
    fn from(error: DateParseError) -> AppError {
        AppError::Validation(format!("due_date: {}", error))
    }
}
