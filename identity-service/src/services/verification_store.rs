//! Identity verification challenge persistence, scoped by organization.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::db::ScopedQuery;
use crate::models::{IdentityVerification, RequestScope, VerificationStatus};
use crate::services::ServiceError;

const ENTITY: &str = "Identity verification";

#[async_trait]
pub trait IdentityVerificationStore: Send + Sync {
    /// Persist a new challenge. The store assigns the id and stamps the
    /// organization from `scope`.
    async fn create(
        &self,
        scope: &RequestScope,
        verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError>;

    /// Overwrite the stored record with the same id.
    async fn update(
        &self,
        scope: &RequestScope,
        verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError>;

    /// Bump only the try count, leaving every other column as stored.
    async fn increment_try_count(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError>;

    /// Move the challenge to `to` only while its status is one of `from`.
    /// `NotFound` when the id is unknown or the status has already moved on.
    async fn transition_status(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        from: &[VerificationStatus],
        to: VerificationStatus,
    ) -> Result<IdentityVerification, ServiceError>;

    async fn find_by_id(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError>;

    /// Exact match on id and code.
    async fn find_by_id_and_unique_code(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        unique_code: &str,
    ) -> Result<IdentityVerification, ServiceError>;
}

#[derive(Clone)]
pub struct PgIdentityVerificationStore {
    pool: PgPool,
}

impl PgIdentityVerificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one(
        &self,
        query: ScopedQuery<'_>,
    ) -> Result<IdentityVerification, ServiceError> {
        let mut builder = query.into_builder();
        builder
            .build_query_as::<IdentityVerification>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound(ENTITY))
    }
}

#[async_trait]
impl IdentityVerificationStore for PgIdentityVerificationStore {
    async fn create(
        &self,
        scope: &RequestScope,
        verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError> {
        let now = Utc::now();

        let stored = sqlx::query_as::<_, IdentityVerification>(
            r#"
            INSERT INTO identity_verifications (
                verification_id, organization_id, user_id, identity_for_code, identity_type_code,
                identity, unique_code, try_count, expired_utc, status_code, data, created_utc, updated_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scope.organization_id)
        .bind(verification.user_id)
        .bind(&verification.identity_for_code)
        .bind(&verification.identity_type_code)
        .bind(&verification.identity)
        .bind(&verification.unique_code)
        .bind(verification.try_count)
        .bind(verification.expired_utc)
        .bind(&verification.status_code)
        .bind(&verification.data)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn update(
        &self,
        scope: &RequestScope,
        verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError> {
        let mut head = QueryBuilder::new("UPDATE identity_verifications SET user_id = ");
        head.push_bind(verification.user_id)
            .push(", identity_for_code = ")
            .push_bind(verification.identity_for_code)
            .push(", identity_type_code = ")
            .push_bind(verification.identity_type_code)
            .push(", identity = ")
            .push_bind(verification.identity)
            .push(", unique_code = ")
            .push_bind(verification.unique_code)
            .push(", try_count = ")
            .push_bind(verification.try_count)
            .push(", expired_utc = ")
            .push_bind(verification.expired_utc)
            .push(", status_code = ")
            .push_bind(verification.status_code)
            .push(", data = ")
            .push_bind(verification.data)
            .push(", updated_utc = NOW()");

        self.fetch_one(
            ScopedQuery::organization(head, "organization_id", scope)
                .and_eq("verification_id", verification.verification_id)
                .tail("RETURNING *"),
        )
        .await
    }

    async fn increment_try_count(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError> {
        self.fetch_one(
            ScopedQuery::organization(
                QueryBuilder::new(
                    "UPDATE identity_verifications SET try_count = try_count + 1, updated_utc = NOW()",
                ),
                "organization_id",
                scope,
            )
            .and_eq("verification_id", verification_id)
            .tail("RETURNING *"),
        )
        .await
    }

    async fn transition_status(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        from: &[VerificationStatus],
        to: VerificationStatus,
    ) -> Result<IdentityVerification, ServiceError> {
        let mut head = QueryBuilder::new("UPDATE identity_verifications SET status_code = ");
        head.push_bind(to.as_str()).push(", updated_utc = NOW()");

        let allowed = from.iter().map(|s| s.as_str().to_string()).collect();

        self.fetch_one(
            ScopedQuery::organization(head, "organization_id", scope)
                .and_eq("verification_id", verification_id)
                .and_any("status_code", allowed)
                .tail("RETURNING *"),
        )
        .await
    }

    async fn find_by_id(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError> {
        self.fetch_one(
            ScopedQuery::organization(
                QueryBuilder::new("SELECT * FROM identity_verifications"),
                "organization_id",
                scope,
            )
            .and_eq("verification_id", verification_id),
        )
        .await
    }

    async fn find_by_id_and_unique_code(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        unique_code: &str,
    ) -> Result<IdentityVerification, ServiceError> {
        self.fetch_one(
            ScopedQuery::organization(
                QueryBuilder::new("SELECT * FROM identity_verifications"),
                "organization_id",
                scope,
            )
            .and_eq("verification_id", verification_id)
            .and_eq("unique_code", unique_code.to_string()),
        )
        .await
    }
}
