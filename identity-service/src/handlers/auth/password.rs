use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{
            ChangePasswordRequest, ForgotPasswordRequest, ForgotPasswordResponse,
            ResetPasswordRequest, VerifyIdentityRequest, VerifyIdentityResponse,
        },
        MessageResponse,
    },
    middleware::AuthUser,
    models::{RequestScope, VerificationStatus},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Request a password reset code by email
#[utoipa::path(
    post,
    path = "/auth/password/forgot",
    request_body = ForgotPasswordRequest,
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization the account belongs to"),
        ("x-origin-type" = String, Header, description = "Portal: CUSTOMER, COMPANY or ADMIN")
    ),
    responses(
        (status = 202, description = "Reset code sent if the email is registered", body = ForgotPasswordResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Password"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    scope: RequestScope,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.recovery.forgot_password(&scope, &req.email).await?;
    Ok((StatusCode::ACCEPTED, Json(ForgotPasswordResponse::from(result))))
}

/// Verify a one-time code
#[utoipa::path(
    post,
    path = "/auth/identity/verify",
    request_body = VerifyIdentityRequest,
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization the account belongs to"),
        ("x-origin-type" = String, Header, description = "Portal: CUSTOMER, COMPANY or ADMIN")
    ),
    responses(
        (status = 200, description = "Identity verified", body = VerifyIdentityResponse),
        (status = 400, description = "Invalid, expired or closed code", body = ErrorResponse)
    ),
    tag = "Password"
)]
pub async fn verify_identity(
    State(state): State<AppState>,
    scope: RequestScope,
    ValidatedJson(req): ValidatedJson<VerifyIdentityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let verification = state
        .recovery
        .verify_identity(&scope, req.verification_id, &req.code)
        .await?;

    Ok((
        StatusCode::OK,
        Json(VerifyIdentityResponse {
            verification_id: verification.verification_id,
            status: verification.status().unwrap_or(VerificationStatus::Verified),
            expired_at: verification.expired_utc,
        }),
    ))
}

/// Reset the password with a verified code
#[utoipa::path(
    post,
    path = "/auth/password/reset",
    request_body = ResetPasswordRequest,
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization the account belongs to"),
        ("x-origin-type" = String, Header, description = "Portal: CUSTOMER, COMPANY or ADMIN")
    ),
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid, expired or closed code", body = ErrorResponse),
        (status = 404, description = "Verified user has no credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Password"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    scope: RequestScope,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .recovery
        .reset_password(
            &scope,
            req.verification_id,
            &req.code,
            &Password::new(req.new_password),
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password has been reset".to_string(),
        }),
    ))
}

/// Change the password of the signed-in account
#[utoipa::path(
    post,
    path = "/auth/password/change",
    request_body = ChangePasswordRequest,
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization the account belongs to"),
        ("x-origin-type" = String, Header, description = "Portal: CUSTOMER, COMPANY or ADMIN")
    ),
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Invalid token or current password", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Password",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    scope: RequestScope,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .change_password(
            &scope,
            &claims,
            &Password::new(req.current_password),
            &Password::new(req.new_password),
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password changed successfully".to_string(),
        }),
    ))
}
