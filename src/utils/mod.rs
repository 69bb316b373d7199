use bcrypt::hash;

use crate::error::AppError;

pub mod validation;

pub use validation::validate_user;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

/// 在阻塞线程池里计算哈希，避免占用异步工作线程
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AppError> {
    match tokio::task::spawn_blocking(move || hash_password(&password, cost)).await {
        Ok(Ok(hashed)) => Ok(hashed),
        Ok(Err(e)) => {
            tracing::error!("Failed to hash password: {}", e);
            Err(AppError::Internal)
        }
        Err(e) => {
            tracing::error!("Password hashing task failed: {}", e);
            Err(AppError::Internal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hashed = hash_password("Secret123", 4).unwrap();
        assert_ne!(hashed, "Secret123");
        assert!(bcrypt::verify("Secret123", &hashed).unwrap());
        assert!(!bcrypt::verify("secret123", &hashed).unwrap());
    }

    #[tokio::test]
    async fn blocking_hash_runs_off_the_runtime() {
        let hashed = hash_password_blocking("Secret123".to_string(), 4).await.unwrap();
        assert!(bcrypt::verify("Secret123", &hashed).unwrap());
    }
}
