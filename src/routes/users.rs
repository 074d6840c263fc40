use crate::{
    auth::{AuthResponse, AuthenticatedUser, ChangePasswordRequest, LoginRequest, RegisterRequest},
    error::AppError,
    models::UserProfile,
    state::AppState,
};
use actix_web::{get, post, put, web, HttpResponse, Responder};
use serde_json::json;

/// Register a new user
///
/// Creates an account and returns its public profile. Usernames are 3 to 50
/// characters and passwords at least 6.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let user = state
        .accounts
        .register(&register_data.username, &register_data.password)
        .await?;
    Ok(HttpResponse::Created().json(UserProfile::from(&user)))
}

/// Login user
///
/// Authenticates a user and returns a session token.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let outcome = state
        .accounts
        .login(&login_data.username, &login_data.password)
        .await?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        token: outcome.token,
        user_id: outcome.user.id,
    }))
}

/// Change password
///
/// Replaces the authenticated user's password after checking the old one.
///
/// ## Request Body:
/// - `old_password`: the current password.
/// - `new_password`: at least 6 characters.
///
/// ## Responses:
/// - `200 OK`: The password was changed. Existing tokens stay valid.
/// - `401 Unauthorized`: Missing or invalid token, or a wrong `old_password`.
/// - `404 Not Found`: The token's user no longer exists.
/// - `422 Unprocessable Entity`: `new_password` is too short.
#[put("/password")]
pub async fn change_password(
    state: web::Data<AppState>,
    request: web::Json<ChangePasswordRequest>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state
        .accounts
        .change_password(user.id(), &request.old_password, &request.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated" })))
}

/// Returns the profile of the authenticated user.
#[get("/me")]
pub async fn me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = state.accounts.get_user(user.id()).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}
