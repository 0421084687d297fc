use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{UserType, VerificationStatus};
use crate::services::{ForgotPasswordResult, LoginResult, SignUpResult};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "Secret123!")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// Expiry as Unix seconds
    #[schema(example = "1767225600")]
    pub expired_at: String,
    #[schema(example = "success")]
    pub status: String,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            token: result.token,
            expired_at: result.expired_at,
            status: result.status,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CustomerSignUpRequest {
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "Secret123!", min_length = 8)]
    pub password: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Full name is required"))]
    #[schema(example = "Alice Doe")]
    pub full_name: String,

    #[schema(example = "Alice")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminSignUpRequest {
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    #[schema(example = "root")]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "Secret123!", min_length = 8)]
    pub password: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "ops@example.com")]
    pub email: String,

    pub display_name: Option<String>,
}

/// Text fields of the multipart company sign-up form.
#[derive(Debug, Default, Validate)]
pub struct CompanySignUpFields {
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,

    pub display_name: Option<String>,
}

/// Multipart form for company sign-up (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CompanySignUpForm {
    #[schema(example = "acme")]
    pub username: String,
    #[schema(example = "Secret123!")]
    pub password: String,
    #[schema(example = "owner@acme.example")]
    pub email: String,
    #[schema(example = "Acme Roasters")]
    pub company_name: String,
    pub display_name: Option<String>,
    /// PNG, JPEG, WebP or SVG, at most 2 MiB
    #[schema(value_type = Option<String>, format = Binary)]
    pub logo: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignUpResponse {
    pub credential_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub user_type: UserType,
}

impl From<SignUpResult> for SignUpResponse {
    fn from(result: SignUpResult) -> Self {
        Self {
            credential_id: result.credential_id,
            user_id: result.user_id,
            role_id: result.role_id,
            user_type: result.user_type,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordResponse {
    pub verification_id: Uuid,
    pub expired_at: DateTime<Utc>,
    #[schema(example = "If the email is registered, a verification code has been sent.")]
    pub message: String,
}

impl From<ForgotPasswordResult> for ForgotPasswordResponse {
    fn from(result: ForgotPasswordResult) -> Self {
        Self {
            verification_id: result.verification_id,
            expired_at: result.expired_at,
            message: "If the email is registered, a verification code has been sent.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyIdentityRequest {
    pub verification_id: Uuid,

    #[validate(length(min = 1, message = "Code is required"))]
    #[schema(example = "123456")]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyIdentityResponse {
    pub verification_id: Uuid,
    pub status: VerificationStatus,
    pub expired_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    pub verification_id: Uuid,

    #[validate(length(min = 1, message = "Code is required"))]
    #[schema(example = "123456")]
    pub code: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "N3wSecret!", min_length = 8)]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(min_length = 8)]
    pub new_password: String,
}
