use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use validator::Validate;

use crate::auth::{CredentialVerifier, TokenService};
use crate::error::{AppError, AuthError};
use crate::models::{NewUser, User, UserInput};
use crate::store::UserStore;

const MIN_PASSWORD_CHARS: usize = 6;

/// A successful login: the session token and the user it was issued for.
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Registration, login and password changes.
#[derive(Clone)]
pub struct AccountManager {
    store: Arc<dyn UserStore>,
    verifier: CredentialVerifier,
    tokens: Arc<TokenService>,
}

impl AccountManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        verifier: CredentialVerifier,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            verifier,
            tokens,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        UserInput {
            username: username.to_string(),
            password: password.to_string(),
        }
        .validate()?;

        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".into()));
        }

        let now = Utc::now();
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: self.verifier.hash(password)?,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    /// Checks the credentials and issues a session token.
    ///
    /// Unknown usernames and wrong passwords are distinct errors here; the
    /// HTTP layer renders both with the same message.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = match self.store.get_user_by_username(username).await? {
            Some(user) => user,
            None => {
                warn!("Login failed: unknown user {:?}", username);
                return Err(AuthError::UserNotFound.into());
            }
        };

        if !self.verifier.verify(password, &user.password_hash)? {
            warn!("Login failed: wrong password for user {}", user.id);
            return Err(AuthError::InvalidPassword.into());
        }

        let token = self.tokens.issue(user.id, &user.username)?;
        info!("User {} logged in", user.id);
        Ok(LoginOutcome { token, user })
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let mut user = self.get_user(user_id).await?;

        if !self.verifier.verify(old_password, &user.password_hash)? {
            warn!("Password change rejected for user {}: wrong password", user_id);
            return Err(AuthError::InvalidPassword.into());
        }

        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "new_password: must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }

        user.password_hash = self.verifier.hash(new_password)?;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        info!("User {} changed their password", user_id);
        Ok(())
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, AppError> {
        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }
}
