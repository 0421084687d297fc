use std::sync::Arc;

use crate::{
    models::{Credential, RequestScope, UserType},
    services::{
        ClaimsContext, CredentialStore, LoginResult, RoleClaim, RoleDirectory, ServiceError,
        SessionClaims, TokenIssuer,
    },
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    roles: Arc<dyn RoleDirectory>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        roles: Arc<dyn RoleDirectory>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            credentials,
            roles,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn sign_in(
        &self,
        scope: &RequestScope,
        username: &str,
        password: &Password,
    ) -> Result<LoginResult, ServiceError> {
        let result = self.try_sign_in(scope, username, password).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(ServiceError::CredentialNotFound) => "unknown_user",
            Err(ServiceError::InvalidPassword) => "invalid_password",
            Err(_) => "error",
        };
        metrics::counter!("identity_sign_in_total", "outcome" => outcome).increment(1);

        result
    }

    async fn try_sign_in(
        &self,
        scope: &RequestScope,
        username: &str,
        password: &Password,
    ) -> Result<LoginResult, ServiceError> {
        let credential = self.credentials.find_by_username(scope, username).await?;

        let context = self.claims_context(scope, &credential).await?;

        // A malformed stored hash counts as a mismatch.
        verify_password(password, &PasswordHashString::new(credential.password_hash.as_str()))
            .map_err(|_| ServiceError::InvalidPassword)?;

        let result = self.tokens.generate_token(&context)?;

        tracing::info!(
            credential_id = %credential.credential_id,
            user_id = %credential.user_id,
            organization_id = %scope.organization_id,
            "User signed in"
        );

        Ok(result)
    }

    /// Credential and user ids, plus the role id for the owning user's type.
    async fn claims_context(
        &self,
        scope: &RequestScope,
        credential: &Credential,
    ) -> Result<ClaimsContext, ServiceError> {
        let context = ClaimsContext::new(
            credential.credential_id,
            credential.user_id,
            credential.organization_id,
        );

        let user_type = credential.user_type().ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "Unknown user type '{}' on credential {}",
                credential.user_type_code,
                credential.credential_id
            ))
        })?;

        // A missing role row is a data fault, not a sign-in outcome.
        let role = self
            .roles
            .find_role_by_user_id(scope, user_type, credential.user_id)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(entity) => ServiceError::Internal(anyhow::anyhow!(
                    "{} record missing for user {}",
                    entity,
                    credential.user_id
                )),
                other => other,
            })?;

        let claim = match user_type {
            UserType::Admin => RoleClaim::Admin(role.role_id),
            UserType::Company => RoleClaim::Company(role.role_id),
            UserType::Customer => RoleClaim::Customer(role.role_id),
        };

        Ok(context.with_role(claim))
    }

    /// Change the password of the credential a session token was issued for.
    pub async fn change_password(
        &self,
        scope: &RequestScope,
        claims: &SessionClaims,
        current_password: &Password,
        new_password: &Password,
    ) -> Result<(), ServiceError> {
        if claims.organization_id != scope.organization_id {
            return Err(ServiceError::InvalidToken);
        }

        let credential = self.credentials.find_by_id(scope, claims.sub).await?;

        verify_password(
            current_password,
            &PasswordHashString::new(credential.password_hash.as_str()),
        )
        .map_err(|_| ServiceError::InvalidPassword)?;

        let new_hash = hash_password(new_password).map_err(ServiceError::Internal)?;

        self.credentials
            .change_password(scope, credential.credential_id, new_hash.as_str())
            .await?;

        tracing::info!(credential_id = %credential.credential_id, "Password changed by owner");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::models::{NewAccount, RoleProfile};
    use crate::services::InMemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    async fn setup(profile: RoleProfile) -> (AuthService, Arc<InMemoryStore>, RequestScope, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let scope = RequestScope::new(Uuid::new_v4(), profile.user_type());
        let hash = hash_password(&Password::new("Secret123!")).unwrap();

        let created = store
            .create_account(
                &scope,
                NewAccount {
                    username: "alice".to_string(),
                    password_hash: hash.into_string(),
                    email: "a@b.com".to_string(),
                    display_name: None,
                    profile,
                },
            )
            .await
            .unwrap();

        let tokens = TokenIssuer::new(&JwtConfig {
            secret: "test-secret".to_string(),
            expiry_hours: 720,
        });
        let service = AuthService::new(store.clone(), store.clone(), tokens);
        (service, store, scope, created.role_id)
    }

    fn customer() -> RoleProfile {
        RoleProfile::Customer {
            full_name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_in_issues_thirty_day_token() {
        let (service, _, scope, role_id) = setup(customer()).await;

        let now = Utc::now().timestamp();
        let result = service
            .sign_in(&scope, "alice", &Password::new("Secret123!"))
            .await
            .unwrap();

        assert!(!result.token.is_empty());
        let expired_at: i64 = result.expired_at.parse().unwrap();
        assert!((expired_at - (now + 30 * 24 * 3600)).abs() <= 5);

        let claims = service.tokens().validate(&result.token).unwrap();
        assert_eq!(claims.customer_id, Some(role_id));
        assert_eq!(claims.admin_id, None);
    }

    #[tokio::test]
    async fn admin_sign_in_carries_admin_id() {
        let (service, _, scope, role_id) = setup(RoleProfile::Admin).await;

        let result = service
            .sign_in(&scope, "alice", &Password::new("Secret123!"))
            .await
            .unwrap();

        let claims = service.tokens().validate(&result.token).unwrap();
        assert_eq!(claims.admin_id, Some(role_id));
        assert_eq!(claims.customer_id, None);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (service, _, scope, _) = setup(customer()).await;

        let result = service
            .sign_in(&scope, "alice", &Password::new("wrong"))
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidPassword)));
    }

    #[tokio::test]
    async fn unknown_username_is_rejected() {
        let (service, _, scope, _) = setup(customer()).await;

        let result = service
            .sign_in(&scope, "bob", &Password::new("Secret123!"))
            .await;
        assert!(matches!(result, Err(ServiceError::CredentialNotFound)));
    }

    #[tokio::test]
    async fn sign_in_from_other_portal_is_rejected() {
        let (service, _, scope, _) = setup(customer()).await;

        let result = service
            .sign_in(
                &scope.with_origin(UserType::Company),
                "alice",
                &Password::new("Secret123!"),
            )
            .await;
        assert!(matches!(result, Err(ServiceError::CredentialNotFound)));
    }

    struct EmptyRoleDirectory;

    #[async_trait::async_trait]
    impl RoleDirectory for EmptyRoleDirectory {
        async fn find_role_by_user_id(
            &self,
            _scope: &RequestScope,
            _user_type: UserType,
            _user_id: Uuid,
        ) -> Result<crate::models::RoleRecord, ServiceError> {
            Err(ServiceError::NotFound("Role"))
        }
    }

    #[tokio::test]
    async fn missing_role_row_is_internal_not_not_found() {
        let (_, store, scope, _) = setup(customer()).await;
        let tokens = TokenIssuer::new(&JwtConfig {
            secret: "test-secret".to_string(),
            expiry_hours: 720,
        });
        let service = AuthService::new(store, Arc::new(EmptyRoleDirectory), tokens);

        let result = service
            .sign_in(&scope, "alice", &Password::new("Secret123!"))
            .await;
        assert!(matches!(result, Err(ServiceError::Internal(_))));
    }

    #[tokio::test]
    async fn changed_password_verifies_against_new_plaintext() {
        let (service, store, scope, _) = setup(customer()).await;
        let token = service
            .sign_in(&scope, "alice", &Password::new("Secret123!"))
            .await
            .unwrap()
            .token;
        let claims = service.tokens().validate(&token).unwrap();

        service
            .change_password(
                &scope,
                &claims,
                &Password::new("Secret123!"),
                &Password::new("N3wSecret!"),
            )
            .await
            .unwrap();

        let stored = store.find_by_id(&scope, claims.sub).await.unwrap();
        assert!(verify_password(
            &Password::new("N3wSecret!"),
            &PasswordHashString::new(stored.password_hash)
        )
        .is_ok());
        assert!(service
            .sign_in(&scope, "alice", &Password::new("Secret123!"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let (service, _, scope, _) = setup(customer()).await;
        let token = service
            .sign_in(&scope, "alice", &Password::new("Secret123!"))
            .await
            .unwrap()
            .token;
        let claims = service.tokens().validate(&token).unwrap();

        let result = service
            .change_password(&scope, &claims, &Password::new("nope"), &Password::new("x"))
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidPassword)));
    }
}
