use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::db::ScopedQuery;
use crate::models::{RequestScope, RoleRecord, UserType};
use crate::services::ServiceError;

/// Resolves the role-specific record (admin, company, customer) owned by a user.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn find_role_by_user_id(
        &self,
        scope: &RequestScope,
        user_type: UserType,
        user_id: Uuid,
    ) -> Result<RoleRecord, ServiceError>;
}

#[derive(Clone)]
pub struct PgRoleDirectory {
    pool: PgPool,
}

impl PgRoleDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn role_select(user_type: UserType) -> (&'static str, &'static str) {
    match user_type {
        UserType::Admin => ("SELECT admin_id, user_id FROM admins", "Admin"),
        UserType::Company => ("SELECT company_id, user_id FROM companies", "Company"),
        UserType::Customer => ("SELECT customer_id, user_id FROM customers", "Customer"),
    }
}

#[async_trait]
impl RoleDirectory for PgRoleDirectory {
    async fn find_role_by_user_id(
        &self,
        scope: &RequestScope,
        user_type: UserType,
        user_id: Uuid,
    ) -> Result<RoleRecord, ServiceError> {
        let (head, entity) = role_select(user_type);

        let mut builder =
            ScopedQuery::organization(QueryBuilder::new(head), "organization_id", scope)
                .and_eq("user_id", user_id)
                .into_builder();

        let (role_id, user_id) = builder
            .build_query_as::<(Uuid, Uuid)>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound(entity))?;

        Ok(RoleRecord {
            role_id,
            user_id,
            user_type,
        })
    }
}
