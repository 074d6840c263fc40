pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::CredentialVerifier;
pub use token::{bearer_token, Claims, TokenService};

/// Payload for `POST /api/users/register`. Field rules are enforced by
/// `AccountManager::register`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Payload for `POST /api/users/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Payload for `PUT /api/users/password`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    /// Must be at least 6 characters long.
    pub new_password: String,
}

/// Response structure after a successful login.
/// Contains the session token and the ID of the authenticated user.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
}
