use crate::error::AppError;
use bcrypt::{hash, verify};

/// One-way password hashing and verification backed by bcrypt.
#[derive(Debug, Clone, Copy)]
pub struct CredentialVerifier {
    cost: u32,
}

impl CredentialVerifier {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<bool, AppError> {
        verify(password, hashed_password)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
    }
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
