//! Query construction that always carries the tenant predicates.
//!
//! Stores never write a bare `WHERE`: they hand the statement head to
//! [`ScopedQuery`], which appends the organization predicate (and, for
//! credentials, the origin-type predicate) before any caller predicate.

use sqlx::{Encode, Postgres, QueryBuilder, Type};

use crate::models::RequestScope;

pub struct ScopedQuery<'a> {
    builder: QueryBuilder<'a, Postgres>,
}

impl<'a> ScopedQuery<'a> {
    /// Scope a statement over `credentials c` and `users u`.
    ///
    /// The head must bring both aliases into the statement (a `JOIN` for
    /// reads, `FROM users u` for updates).
    pub fn credentials(head: QueryBuilder<'a, Postgres>, scope: &RequestScope) -> Self {
        let mut builder = head;
        builder
            .push(" WHERE c.organization_id = ")
            .push_bind(scope.organization_id)
            .push(" AND u.organization_id = c.organization_id AND u.user_id = c.user_id")
            .push(" AND u.user_type_code = ")
            .push_bind(scope.origin_type.as_str());
        Self { builder }
    }

    /// Scope a statement by organization only. `column` is the (optionally
    /// alias-qualified) organization column.
    pub fn organization(
        head: QueryBuilder<'a, Postgres>,
        column: &str,
        scope: &RequestScope,
    ) -> Self {
        let mut builder = head;
        builder
            .push(" WHERE ")
            .push(column)
            .push(" = ")
            .push_bind(scope.organization_id);
        Self { builder }
    }

    /// Append `AND column = value`.
    pub fn and_eq<T>(mut self, column: &str, value: T) -> Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        self.builder
            .push(" AND ")
            .push(column)
            .push(" = ")
            .push_bind(value);
        self
    }

    /// Append `AND column = ANY(values)`.
    pub fn and_any(mut self, column: &str, values: Vec<String>) -> Self {
        self.builder
            .push(" AND ")
            .push(column)
            .push(" = ANY(")
            .push_bind(values)
            .push(")");
        self
    }

    /// Append trailing SQL such as `ORDER BY` or `RETURNING`.
    pub fn tail(mut self, sql: &str) -> Self {
        self.builder.push(" ").push(sql);
        self
    }

    pub fn into_builder(self) -> QueryBuilder<'a, Postgres> {
        self.builder
    }

    pub fn sql(&self) -> &str {
        self.builder.sql()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;
    use uuid::Uuid;

    fn scope() -> RequestScope {
        RequestScope::new(Uuid::new_v4(), UserType::Customer)
    }

    #[test]
    fn credential_queries_always_carry_tenant_and_origin() {
        let query = ScopedQuery::credentials(
            QueryBuilder::new("SELECT c.* FROM credentials c JOIN users u ON u.user_id = c.user_id"),
            &scope(),
        )
        .and_eq("c.username", "alice".to_string());

        assert_eq!(
            query.sql(),
            "SELECT c.* FROM credentials c JOIN users u ON u.user_id = c.user_id \
             WHERE c.organization_id = $1 \
             AND u.organization_id = c.organization_id AND u.user_id = c.user_id \
             AND u.user_type_code = $2 AND c.username = $3"
        );
    }

    #[test]
    fn organization_scope_precedes_caller_predicates() {
        let query = ScopedQuery::organization(
            QueryBuilder::new("SELECT * FROM identity_verifications"),
            "organization_id",
            &scope(),
        )
        .and_eq("verification_id", Uuid::new_v4())
        .tail("LIMIT 1");

        assert_eq!(
            query.sql(),
            "SELECT * FROM identity_verifications WHERE organization_id = $1 \
             AND verification_id = $2 LIMIT 1"
        );
    }

    #[test]
    fn guarded_update_lists_allowed_states() {
        let mut head = QueryBuilder::new("UPDATE identity_verifications SET status_code = ");
        head.push_bind("EXPIRED");
        let query = ScopedQuery::organization(head, "organization_id", &scope())
            .and_eq("verification_id", Uuid::new_v4())
            .and_any("status_code", vec!["PENDING".to_string(), "VERIFIED".to_string()])
            .tail("RETURNING *");

        assert_eq!(
            query.sql(),
            "UPDATE identity_verifications SET status_code = $1 WHERE organization_id = $2 \
             AND verification_id = $3 AND status_code = ANY($4) RETURNING *"
        );
    }
}
