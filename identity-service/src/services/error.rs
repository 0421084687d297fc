use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Credential not found")]
    CredentialNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid verification code")]
    InvalidVerificationCode,

    #[error("Verification code expired")]
    VerificationExpired,

    #[error("Verification is no longer open")]
    VerificationClosed,

    #[error("Email error: {0}")]
    Email(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            // Unknown username and wrong password are indistinguishable to callers.
            ServiceError::CredentialNotFound | ServiceError::InvalidPassword => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::NotFound(entity) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", entity))
            }
            ServiceError::TokenSigning(e) => {
                AppError::InternalError(anyhow::anyhow!("Token signing failed: {}", e))
            }
            ServiceError::InvalidToken => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::UsernameTaken => {
                AppError::Conflict(anyhow::anyhow!("Username already taken"))
            }
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::InvalidVerificationCode => {
                AppError::BadRequest(anyhow::anyhow!("Invalid verification code"))
            }
            ServiceError::VerificationExpired => {
                AppError::BadRequest(anyhow::anyhow!("Verification code expired"))
            }
            ServiceError::VerificationClosed => {
                AppError::BadRequest(anyhow::anyhow!("Verification is no longer open"))
            }
            ServiceError::Email(e) => AppError::EmailError(e),
            ServiceError::Storage(e) => AppError::BadGateway(format!("Object storage: {}", e)),
        }
    }
}
