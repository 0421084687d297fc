use std::sync::Arc;
use uuid::Uuid;

use crate::models::{IdentityVerification, RequestScope, VerificationStatus};
use crate::services::{IdentityVerificationStore, ServiceError};

/// Thin orchestration over the challenge store.
///
/// Expiry, status and retry bookkeeping belong to callers; this service only
/// guarantees that new challenges start with a zero try count.
#[derive(Clone)]
pub struct IdentityVerificationService {
    store: Arc<dyn IdentityVerificationStore>,
}

impl IdentityVerificationService {
    pub fn new(store: Arc<dyn IdentityVerificationStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        scope: &RequestScope,
        mut verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError> {
        verification.try_count = 0;

        let stored = self.store.create(scope, verification).await?;

        metrics::counter!(
            "identity_verification_created_total",
            "identity_for" => stored.identity_for_code.clone()
        )
        .increment(1);
        tracing::info!(
            verification_id = %stored.verification_id,
            user_id = %stored.user_id,
            identity_for = %stored.identity_for_code,
            "Identity verification created"
        );

        Ok(stored)
    }

    pub async fn update(
        &self,
        scope: &RequestScope,
        verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError> {
        self.store.update(scope, verification).await
    }

    pub async fn increment_try_count(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError> {
        self.store.increment_try_count(scope, verification_id).await
    }

    pub async fn transition_status(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        from: &[VerificationStatus],
        to: VerificationStatus,
    ) -> Result<IdentityVerification, ServiceError> {
        self.store
            .transition_status(scope, verification_id, from, to)
            .await
    }

    pub async fn find_by_id(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError> {
        self.store.find_by_id(scope, verification_id).await
    }

    pub async fn find_by_id_and_unique_code(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        unique_code: &str,
    ) -> Result<IdentityVerification, ServiceError> {
        self.store
            .find_by_id_and_unique_code(scope, verification_id, unique_code)
            .await
    }
}
