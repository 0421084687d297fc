use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::auth::{AdminSignUpRequest, CompanySignUpFields, CustomerSignUpRequest, SignUpResponse},
    models::RequestScope,
    services::{LogoUpload, RoleSignUp, SignUpRequest, MAX_LOGO_BYTES},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Register a customer account
#[utoipa::path(
    post,
    path = "/auth/sign-up/customer",
    request_body = CustomerSignUpRequest,
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization to register in"),
        ("x-origin-type" = String, Header, description = "Must be CUSTOMER")
    ),
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Invalid scope", body = ErrorResponse),
        (status = 409, description = "Username or email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn sign_up_customer(
    State(state): State<AppState>,
    scope: RequestScope,
    ValidatedJson(req): ValidatedJson<CustomerSignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .accounts
        .sign_up(
            &scope,
            SignUpRequest {
                username: req.username,
                password: Password::new(req.password),
                email: req.email,
                display_name: req.display_name,
                role: RoleSignUp::Customer {
                    full_name: req.full_name,
                },
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SignUpResponse::from(result))))
}

/// Register a company account, optionally with a logo
#[utoipa::path(
    post,
    path = "/auth/sign-up/company",
    request_body(content = CompanySignUpForm, content_type = "multipart/form-data"),
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization to register in"),
        ("x-origin-type" = String, Header, description = "Must be COMPANY")
    ),
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Invalid form or scope", body = ErrorResponse),
        (status = 409, description = "Username or email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 502, description = "Logo upload failed", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn sign_up_company(
    State(state): State<AppState>,
    scope: RequestScope,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut fields = CompanySignUpFields::default();
    let mut logo = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "logo" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Failed to read logo bytes: {}", e))
            })?;
            if bytes.len() > MAX_LOGO_BYTES {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Logo too large (max {} bytes)",
                    MAX_LOGO_BYTES
                )));
            }
            // Browsers send an empty part when no file is chosen
            if !bytes.is_empty() {
                logo = Some(LogoUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read field '{}': {}", name, e))
        })?;

        match name.as_str() {
            "username" => fields.username = value,
            "password" => fields.password = value,
            "email" => fields.email = value,
            "company_name" => fields.company_name = value,
            "display_name" => fields.display_name = Some(value).filter(|v| !v.is_empty()),
            other => tracing::debug!(field = %other, "Ignoring unknown sign-up field"),
        }
    }

    fields.validate()?;

    let result = state
        .accounts
        .sign_up(
            &scope,
            SignUpRequest {
                username: fields.username,
                password: Password::new(fields.password),
                email: fields.email,
                display_name: fields.display_name,
                role: RoleSignUp::Company {
                    company_name: fields.company_name,
                    logo,
                },
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SignUpResponse::from(result))))
}

/// Register an admin account (requires admin API key)
#[utoipa::path(
    post,
    path = "/auth/admin/sign-up",
    request_body = AdminSignUpRequest,
    params(
        ("x-organization-id" = Uuid, Header, description = "Organization to register in"),
        ("x-origin-type" = String, Header, description = "Must be ADMIN")
    ),
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 401, description = "Missing or invalid admin API key", body = ErrorResponse),
        (status = 409, description = "Username or email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Admin",
    security(
        ("admin_api_key" = [])
    )
)]
pub async fn sign_up_admin(
    State(state): State<AppState>,
    scope: RequestScope,
    ValidatedJson(req): ValidatedJson<AdminSignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .accounts
        .sign_up(
            &scope,
            SignUpRequest {
                username: req.username,
                password: Password::new(req.password),
                email: req.email,
                display_name: req.display_name,
                role: RoleSignUp::Admin,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SignUpResponse::from(result))))
}
