use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{LoginResponse, SignInRequest},
    models::RequestScope,
    utils::{Password, ValidatedJson},
    AppState,
};

/// Sign in with username and password
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization the account belongs to"),
        ("x-origin-type" = String, Header, description = "Portal: CUSTOMER, COMPANY or ADMIN")
    ),
    responses(
        (status = 200, description = "Sign-in successful", body = LoginResponse),
        (status = 400, description = "Missing or invalid scope headers", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    scope: RequestScope,
    ValidatedJson(req): ValidatedJson<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .auth
        .sign_in(&scope, &req.username, &Password::new(req.password))
        .await?;
    Ok((StatusCode::OK, Json(LoginResponse::from(result))))
}
