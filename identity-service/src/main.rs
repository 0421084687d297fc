use identity_service::{
    build_router,
    config::{IdentityConfig, StorageBackend},
    db,
    services::{
        EmailService, LocalStorage, ObjectStorage, PgCredentialStore, PgIdentityVerificationStore,
        PgRoleDirectory, S3Storage,
    },
    Adapters, AppState,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on invalid configuration
    let config = IdentityConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    identity_service::services::metrics::init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    let pool = db::connect(&config.database).await?;

    let storage: Arc<dyn ObjectStorage> = match config.storage.backend {
        StorageBackend::S3 => {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            tracing::info!(bucket = %config.storage.logo_bucket, "Using S3 object storage");
            Arc::new(S3Storage::new(aws_sdk_s3::Client::new(&aws_config)))
        }
        StorageBackend::Local => {
            tracing::info!(path = %config.storage.local_path, "Using local object storage");
            Arc::new(LocalStorage::new(&config.storage.local_path).await?)
        }
    };

    let email = Arc::new(EmailService::new(&config.smtp)?);

    let adapters = Adapters {
        credentials: Arc::new(PgCredentialStore::new(pool.clone())),
        roles: Arc::new(PgRoleDirectory::new(pool.clone())),
        verifications: Arc::new(PgIdentityVerificationStore::new(pool)),
        email,
        storage,
    };

    let addr: SocketAddr = config
        .common
        .bind_address()
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid bind address: {}", e)))?;

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );

    let state = AppState::new(config, adapters);
    let app = build_router(state).await?;

    let _guard = service_span.enter();
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
