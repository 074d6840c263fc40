use std::sync::Arc;

use crate::auth::{CredentialVerifier, TokenService};
use crate::config::Config;
use crate::services::{AccountManager, TaskManager};
use crate::store::{TaskStore, UserStore};

/// Shared application state handed to every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskManager,
    pub accounts: AccountManager,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(
        task_store: Arc<dyn TaskStore>,
        user_store: Arc<dyn UserStore>,
        verifier: CredentialVerifier,
        tokens: TokenService,
    ) -> Self {
        let tokens = Arc::new(tokens);
        Self {
            tasks: TaskManager::new(task_store),
            accounts: AccountManager::new(user_store, verifier, tokens.clone()),
            tokens,
        }
    }

    /// Builds the state for a store that serves both users and tasks.
    pub fn from_config<S>(config: &Config, store: Arc<S>) -> Self
    where
        S: TaskStore + UserStore + 'static,
    {
        Self::new(
            store.clone(),
            store,
            CredentialVerifier::new(config.bcrypt_cost),
            TokenService::new(&config.jwt()),
        )
    }
}
