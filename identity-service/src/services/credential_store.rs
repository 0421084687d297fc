//! Credential persistence.
//!
//! Every lookup is bound to a [`RequestScope`]: the organization id and the
//! origin type are predicates on every query, never caller discipline.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::db::ScopedQuery;
use crate::models::{CreatedAccount, Credential, NewAccount, RequestScope, RoleProfile};
use crate::services::ServiceError;

pub(crate) const USERNAME_CONSTRAINT: &str = "credentials_org_username_key";
pub(crate) const EMAIL_CONSTRAINT: &str = "users_org_type_email_key";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(
        &self,
        scope: &RequestScope,
        username: &str,
    ) -> Result<Credential, ServiceError>;

    async fn find_by_email(
        &self,
        scope: &RequestScope,
        email: &str,
    ) -> Result<Credential, ServiceError>;

    async fn find_by_id(
        &self,
        scope: &RequestScope,
        credential_id: Uuid,
    ) -> Result<Credential, ServiceError>;

    /// Replace the stored hash. Fails with `CredentialNotFound` when no
    /// credential with that id is visible in `scope`.
    async fn change_password(
        &self,
        scope: &RequestScope,
        credential_id: Uuid,
        password_hash: &str,
    ) -> Result<(), ServiceError>;

    async fn find_all_by_user_id(
        &self,
        scope: &RequestScope,
        user_id: Uuid,
    ) -> Result<Vec<Credential>, ServiceError>;

    /// Write user, role record and credential as one unit.
    async fn create_account(
        &self,
        scope: &RequestScope,
        account: NewAccount,
    ) -> Result<CreatedAccount, ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}

/// Reject accounts whose role does not match the portal the request came from.
pub(crate) fn ensure_origin_matches(
    scope: &RequestScope,
    profile: &RoleProfile,
) -> Result<(), ServiceError> {
    if profile.user_type() != scope.origin_type {
        return Err(ServiceError::Validation(format!(
            "Cannot create a {} account from the {} portal",
            profile.user_type(),
            scope.origin_type
        )));
    }
    Ok(())
}

const CREDENTIAL_SELECT: &str = "SELECT c.credential_id, c.organization_id, c.username, \
     c.password_hash, c.user_id, u.user_type_code, u.email, c.created_utc, c.updated_utc \
     FROM credentials c JOIN users u ON u.user_id = c.user_id";

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select(scope: &RequestScope) -> ScopedQuery<'static> {
        ScopedQuery::credentials(QueryBuilder::new(CREDENTIAL_SELECT), scope)
    }

    async fn fetch_one(&self, query: ScopedQuery<'_>) -> Result<Credential, ServiceError> {
        let mut builder = query.into_builder();
        builder
            .build_query_as::<Credential>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::CredentialNotFound)
    }
}

fn map_unique_violation(err: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(USERNAME_CONSTRAINT) => return ServiceError::UsernameTaken,
                Some(EMAIL_CONSTRAINT) => return ServiceError::EmailAlreadyRegistered,
                _ => {}
            }
        }
    }
    ServiceError::Database(err)
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(
        &self,
        scope: &RequestScope,
        username: &str,
    ) -> Result<Credential, ServiceError> {
        self.fetch_one(Self::select(scope).and_eq("c.username", username.to_string()))
            .await
    }

    async fn find_by_email(
        &self,
        scope: &RequestScope,
        email: &str,
    ) -> Result<Credential, ServiceError> {
        self.fetch_one(
            Self::select(scope)
                .and_eq("u.email", email.to_string())
                .tail("ORDER BY c.created_utc LIMIT 1"),
        )
        .await
    }

    async fn find_by_id(
        &self,
        scope: &RequestScope,
        credential_id: Uuid,
    ) -> Result<Credential, ServiceError> {
        self.fetch_one(Self::select(scope).and_eq("c.credential_id", credential_id))
            .await
    }

    async fn change_password(
        &self,
        scope: &RequestScope,
        credential_id: Uuid,
        password_hash: &str,
    ) -> Result<(), ServiceError> {
        let mut head = QueryBuilder::new("UPDATE credentials c SET password_hash = ");
        head.push_bind(password_hash.to_string())
            .push(", updated_utc = NOW() FROM users u");

        let mut builder = ScopedQuery::credentials(head, scope)
            .and_eq("c.credential_id", credential_id)
            .into_builder();

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::CredentialNotFound);
        }

        tracing::info!(credential_id = %credential_id, "Password changed");
        Ok(())
    }

    async fn find_all_by_user_id(
        &self,
        scope: &RequestScope,
        user_id: Uuid,
    ) -> Result<Vec<Credential>, ServiceError> {
        let mut builder = Self::select(scope)
            .and_eq("c.user_id", user_id)
            .tail("ORDER BY c.created_utc")
            .into_builder();

        let credentials = builder
            .build_query_as::<Credential>()
            .fetch_all(&self.pool)
            .await?;
        Ok(credentials)
    }

    async fn create_account(
        &self,
        scope: &RequestScope,
        account: NewAccount,
    ) -> Result<CreatedAccount, ServiceError> {
        ensure_origin_matches(scope, &account.profile)?;

        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let credential_id = Uuid::new_v4();
        let user_type = account.profile.user_type();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id, organization_id, user_type_code, email, display_name, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(scope.organization_id)
        .bind(user_type.as_str())
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        match &account.profile {
            RoleProfile::Customer { full_name } => {
                sqlx::query(
                    "INSERT INTO customers (customer_id, organization_id, user_id, full_name) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(role_id)
                .bind(scope.organization_id)
                .bind(user_id)
                .bind(full_name)
                .execute(&mut *tx)
                .await?;
            }
            RoleProfile::Company {
                company_name,
                logo_location,
            } => {
                sqlx::query(
                    "INSERT INTO companies (company_id, organization_id, user_id, company_name, logo_location) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(role_id)
                .bind(scope.organization_id)
                .bind(user_id)
                .bind(company_name)
                .bind(logo_location)
                .execute(&mut *tx)
                .await?;
            }
            RoleProfile::Admin => {
                sqlx::query(
                    "INSERT INTO admins (admin_id, organization_id, user_id) VALUES ($1, $2, $3)",
                )
                .bind(role_id)
                .bind(scope.organization_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO credentials (credential_id, organization_id, user_id, username, password_hash, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(credential_id)
        .bind(scope.organization_id)
        .bind(user_id)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            organization_id = %scope.organization_id,
            user_type = %user_type,
            "Account created"
        );

        Ok(CreatedAccount {
            credential: Credential {
                credential_id,
                organization_id: scope.organization_id,
                username: account.username,
                password_hash: account.password_hash,
                user_id,
                user_type_code: user_type.as_str().to_string(),
                email: account.email,
                created_utc: now,
                updated_utc: now,
            },
            role_id,
        })
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        crate::db::ping(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;

    #[test]
    fn account_role_must_match_origin() {
        let scope = RequestScope::new(Uuid::new_v4(), UserType::Customer);

        assert!(ensure_origin_matches(
            &scope,
            &RoleProfile::Customer {
                full_name: "Alice".to_string()
            }
        )
        .is_ok());
        assert!(matches!(
            ensure_origin_matches(&scope, &RoleProfile::Admin),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn credential_lookups_are_scoped() {
        let scope = RequestScope::new(Uuid::new_v4(), UserType::Company);
        let query = PgCredentialStore::select(&scope).and_eq("c.username", "acme".to_string());

        assert!(query.sql().contains("c.organization_id = $1"));
        assert!(query.sql().contains("u.user_type_code = $2"));
        assert!(query.sql().ends_with("c.username = $3"));
    }
}
