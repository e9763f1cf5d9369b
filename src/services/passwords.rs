use bcrypt::DEFAULT_COST;

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    bcrypt::verify(password, hashed)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to verify password: {e}")))
}
