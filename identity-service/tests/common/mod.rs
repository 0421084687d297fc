#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use identity_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, IdentityConfig, JwtConfig, RateLimitConfig, SecurityConfig,
        SmtpConfig, StorageBackend, StorageConfig, SwaggerConfig, SwaggerMode, VerificationConfig,
    },
    services::{InMemoryStore, LocalStorage, MockEmailService},
    Adapters, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const ADMIN_API_KEY: &str = "test-admin-key";
pub const JWT_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "Secret123!";

pub fn test_config(storage_path: &str) -> IdentityConfig {
    IdentityConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "identity-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            expiry_hours: 720,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            user: String::new(),
            password: String::new(),
            from: "no-reply@localhost".to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            local_path: storage_path.to_string(),
            logo_bucket: "company-logos".to_string(),
        },
        verification: VerificationConfig {
            code_ttl_minutes: 15,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_api_key: ADMIN_API_KEY.to_string(),
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
        rate_limit: RateLimitConfig {
            sign_in_attempts: 1000,
            sign_in_window_seconds: 60,
            forgot_password_attempts: 1000,
            forgot_password_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

/// Router wired to in-memory stores, a recording mailbox and local storage.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub mailbox: MockEmailService,
    pub organization_id: Uuid,
    pub storage_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut IdentityConfig)) -> Self {
        let storage_dir = TempDir::new().expect("Failed to create storage dir");
        let mut config = test_config(&storage_dir.path().to_string_lossy());
        customize(&mut config);

        let store = Arc::new(InMemoryStore::new());
        let mailbox = MockEmailService::new();
        let storage = LocalStorage::new(storage_dir.path())
            .await
            .expect("Failed to create local storage");

        let adapters = Adapters {
            credentials: store.clone(),
            roles: store.clone(),
            verifications: store.clone(),
            email: Arc::new(mailbox.clone()),
            storage: Arc::new(storage),
        };

        let router = build_router(AppState::new(config, adapters))
            .await
            .expect("Failed to build router");

        Self {
            router,
            store,
            mailbox,
            organization_id: Uuid::new_v4(),
            storage_dir,
        }
    }

    pub fn request(&self, method: &str, uri: &str, origin: &str) -> axum::http::request::Builder {
        scoped_request(method, uri, self.organization_id, origin)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(
        &self,
        uri: &str,
        origin: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = self
            .request("POST", uri, origin)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    pub async fn sign_up_customer(&self, username: &str, email: &str) -> serde_json::Value {
        let (status, body) = self
            .post_json(
                "/auth/sign-up/customer",
                "CUSTOMER",
                serde_json::json!({
                    "username": username,
                    "password": PASSWORD,
                    "email": email,
                    "full_name": "Test Customer",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "sign-up failed: {}", body);
        body
    }

    pub async fn sign_in(
        &self,
        origin: &str,
        username: &str,
        password: &str,
    ) -> (StatusCode, serde_json::Value) {
        self.post_json(
            "/auth/sign-in",
            origin,
            serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }
}

pub fn scoped_request(
    method: &str,
    uri: &str,
    organization_id: Uuid,
    origin: &str,
) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-organization-id", organization_id.to_string())
        .header("x-origin-type", origin)
        .extension(axum::extract::ConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            8080,
        ))))
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

/// Encode text fields and an optional file part as `multipart/form-data`.
pub fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"logo\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
