pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, IdentityConfig, SwaggerMode};
use crate::middleware::{ORGANIZATION_ID_HEADER, ORIGIN_TYPE_HEADER};
use crate::services::{
    AccountService, AuthService, CredentialStore, EmailProvider, IdentityVerificationService,
    IdentityVerificationStore, ObjectStorage, PasswordRecoveryService, RoleDirectory, TokenIssuer,
};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::session::sign_in,
        handlers::auth::registration::sign_up_customer,
        handlers::auth::registration::sign_up_company,
        handlers::auth::registration::sign_up_admin,
        handlers::auth::password::forgot_password,
        handlers::auth::password::verify_identity,
        handlers::auth::password::reset_password,
        handlers::auth::password::change_password,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::SignInRequest,
            dtos::auth::LoginResponse,
            dtos::auth::CustomerSignUpRequest,
            dtos::auth::CompanySignUpForm,
            dtos::auth::AdminSignUpRequest,
            dtos::auth::SignUpResponse,
            dtos::auth::ForgotPasswordRequest,
            dtos::auth::ForgotPasswordResponse,
            dtos::auth::VerifyIdentityRequest,
            dtos::auth::VerifyIdentityResponse,
            dtos::auth::ResetPasswordRequest,
            dtos::auth::ChangePasswordRequest,
            models::UserType,
            models::VerificationStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sign-in and session tokens"),
        (name = "Registration", description = "Customer and company sign-up"),
        (name = "Password", description = "Password recovery and change"),
        (name = "Admin", description = "Administrative operations"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "admin_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    middleware::admin::ADMIN_API_KEY_HEADER,
                ))),
            );
        }
    }
}

/// Storage and delivery backends the services run on.
#[derive(Clone)]
pub struct Adapters {
    pub credentials: Arc<dyn CredentialStore>,
    pub roles: Arc<dyn RoleDirectory>,
    pub verifications: Arc<dyn IdentityVerificationStore>,
    pub email: Arc<dyn EmailProvider>,
    pub storage: Arc<dyn ObjectStorage>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IdentityConfig>,
    pub credentials: Arc<dyn CredentialStore>,
    pub auth: AuthService,
    pub accounts: AccountService,
    pub recovery: PasswordRecoveryService,
    pub sign_in_rate_limiter: IpRateLimiter,
    pub forgot_password_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(config: IdentityConfig, adapters: Adapters) -> Self {
        let tokens = TokenIssuer::new(&config.jwt);
        let auth = AuthService::new(adapters.credentials.clone(), adapters.roles, tokens);
        let accounts = AccountService::new(
            adapters.credentials.clone(),
            adapters.storage,
            config.storage.logo_bucket.clone(),
        );
        let recovery = PasswordRecoveryService::new(
            adapters.credentials.clone(),
            IdentityVerificationService::new(adapters.verifications),
            adapters.email,
            config.verification.code_ttl_minutes,
        );

        let limits = &config.rate_limit;
        let sign_in_rate_limiter =
            create_ip_rate_limiter(limits.sign_in_attempts, limits.sign_in_window_seconds);
        let forgot_password_rate_limiter = create_ip_rate_limiter(
            limits.forgot_password_attempts,
            limits.forgot_password_window_seconds,
        );
        let ip_rate_limiter =
            create_ip_rate_limiter(limits.global_ip_limit, limits.global_ip_window_seconds);

        Self {
            config: Arc::new(config),
            credentials: adapters.credentials,
            auth,
            accounts,
            recovery,
            sign_in_rate_limiter,
            forgot_password_rate_limiter,
            ip_rate_limiter,
        }
    }
}

fn cors_layer(config: &IdentityConfig) -> Result<CorsLayer, AppError> {
    let origins = config
        .security
        .allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
        })
        .collect::<Result<Vec<HeaderValue>, AppError>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware::admin::ADMIN_API_KEY_HEADER),
            HeaderName::from_static(ORGANIZATION_ID_HEADER),
            HeaderName::from_static(ORIGIN_TYPE_HEADER),
        ]))
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config)?;

    let sign_in_route = Router::new()
        .route("/auth/sign-in", post(handlers::auth::sign_in))
        .layer(from_fn_with_state(
            state.sign_in_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let forgot_password_route = Router::new()
        .route("/auth/password/forgot", post(handlers::auth::forgot_password))
        .layer(from_fn_with_state(
            state.forgot_password_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let admin_routes = Router::new()
        .route("/auth/admin/sign-up", post(handlers::auth::sign_up_admin))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    let authenticated_routes = Router::new()
        .route(
            "/auth/password/change",
            post(handlers::auth::change_password),
        )
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    let swagger_mode = match state.config.environment {
        Environment::Dev => SwaggerMode::Public,
        Environment::Prod => state.config.swagger.enabled.clone(),
    };

    match swagger_mode {
        SwaggerMode::Public => {
            app = app.merge(
                SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()),
            );
        }
        SwaggerMode::Authenticated => {
            app = app.merge(
                Router::new()
                    .merge(
                        SwaggerUi::new("/docs")
                            .url("/.well-known/openapi.json", ApiDoc::openapi()),
                    )
                    .layer(from_fn_with_state(
                        state.clone(),
                        middleware::admin_auth_middleware,
                    )),
            );
        }
        SwaggerMode::Disabled => {
            // OpenAPI JSON stays available for programmatic clients
            app = app.route(
                "/.well-known/openapi.json",
                get(|| async { Json(ApiDoc::openapi()) }),
            );
        }
    }

    let app = app
        .route(
            "/auth/sign-up/customer",
            post(handlers::auth::sign_up_customer),
        )
        .route(
            "/auth/sign-up/company",
            post(handlers::auth::sign_up_company),
        )
        .route(
            "/auth/identity/verify",
            post(handlers::auth::verify_identity),
        )
        .route("/auth/password/reset", post(handlers::auth::reset_password))
        .merge(sign_in_route)
        .merge(forgot_password_route)
        .merge(admin_routes)
        .merge(authenticated_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors);

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.credentials.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Credential store health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": "up"
        }
    })))
}
