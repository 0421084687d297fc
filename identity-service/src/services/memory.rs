//! In-memory store adapters for tests and local runs without PostgreSQL.
//!
//! Mirrors the scoping and uniqueness rules of the PostgreSQL stores.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    CreatedAccount, Credential, IdentityVerification, NewAccount, RequestScope, RoleRecord,
    UserType, VerificationStatus,
};
use crate::services::credential_store::ensure_origin_matches;
use crate::services::{CredentialStore, IdentityVerificationStore, RoleDirectory, ServiceError};

#[derive(Debug, Clone)]
struct StoredUser {
    organization_id: Uuid,
    user_type: UserType,
    email: String,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, StoredUser>,
    credentials: HashMap<Uuid, Credential>,
    roles: HashMap<(Uuid, UserType, Uuid), RoleRecord>,
    verifications: HashMap<Uuid, IdentityVerification>,
}

impl State {
    fn visible(credential: &Credential, scope: &RequestScope) -> bool {
        credential.organization_id == scope.organization_id
            && credential.user_type() == Some(scope.origin_type)
    }

    fn find_credential<F>(&self, scope: &RequestScope, pred: F) -> Result<Credential, ServiceError>
    where
        F: Fn(&Credential) -> bool,
    {
        self.credentials
            .values()
            .filter(|c| Self::visible(c, scope))
            .filter(|c| pred(c))
            .min_by_key(|c| c.created_utc)
            .cloned()
            .ok_or(ServiceError::CredentialNotFound)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, ServiceError> {
        self.state
            .lock()
            .map_err(|_| ServiceError::Internal(anyhow::anyhow!("in-memory store lock poisoned")))
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_by_username(
        &self,
        scope: &RequestScope,
        username: &str,
    ) -> Result<Credential, ServiceError> {
        self.lock()?.find_credential(scope, |c| c.username == username)
    }

    async fn find_by_email(
        &self,
        scope: &RequestScope,
        email: &str,
    ) -> Result<Credential, ServiceError> {
        self.lock()?.find_credential(scope, |c| c.email == email)
    }

    async fn find_by_id(
        &self,
        scope: &RequestScope,
        credential_id: Uuid,
    ) -> Result<Credential, ServiceError> {
        self.lock()?
            .find_credential(scope, |c| c.credential_id == credential_id)
    }

    async fn change_password(
        &self,
        scope: &RequestScope,
        credential_id: Uuid,
        password_hash: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        let credential = state
            .credentials
            .get_mut(&credential_id)
            .filter(|c| State::visible(c, scope))
            .ok_or(ServiceError::CredentialNotFound)?;

        credential.password_hash = password_hash.to_string();
        credential.updated_utc = Utc::now();
        Ok(())
    }

    async fn find_all_by_user_id(
        &self,
        scope: &RequestScope,
        user_id: Uuid,
    ) -> Result<Vec<Credential>, ServiceError> {
        let state = self.lock()?;
        let mut credentials: Vec<Credential> = state
            .credentials
            .values()
            .filter(|c| State::visible(c, scope) && c.user_id == user_id)
            .cloned()
            .collect();
        credentials.sort_by_key(|c| c.created_utc);
        Ok(credentials)
    }

    async fn create_account(
        &self,
        scope: &RequestScope,
        account: NewAccount,
    ) -> Result<CreatedAccount, ServiceError> {
        ensure_origin_matches(scope, &account.profile)?;
        let user_type = account.profile.user_type();

        let mut state = self.lock()?;

        if state.users.values().any(|u| {
            u.organization_id == scope.organization_id
                && u.user_type == user_type
                && u.email == account.email
        }) {
            return Err(ServiceError::EmailAlreadyRegistered);
        }
        if state.credentials.values().any(|c| {
            c.organization_id == scope.organization_id && c.username == account.username
        }) {
            return Err(ServiceError::UsernameTaken);
        }

        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();

        state.users.insert(
            user_id,
            StoredUser {
                organization_id: scope.organization_id,
                user_type,
                email: account.email.clone(),
            },
        );
        state.roles.insert(
            (scope.organization_id, user_type, user_id),
            RoleRecord {
                role_id,
                user_id,
                user_type,
            },
        );

        let credential = Credential {
            credential_id: Uuid::new_v4(),
            organization_id: scope.organization_id,
            username: account.username,
            password_hash: account.password_hash,
            user_id,
            user_type_code: user_type.as_str().to_string(),
            email: account.email,
            created_utc: now,
            updated_utc: now,
        };
        state
            .credentials
            .insert(credential.credential_id, credential.clone());

        Ok(CreatedAccount {
            credential,
            role_id,
        })
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl RoleDirectory for InMemoryStore {
    async fn find_role_by_user_id(
        &self,
        scope: &RequestScope,
        user_type: UserType,
        user_id: Uuid,
    ) -> Result<RoleRecord, ServiceError> {
        self.lock()?
            .roles
            .get(&(scope.organization_id, user_type, user_id))
            .cloned()
            .ok_or(ServiceError::NotFound("Role"))
    }
}

#[async_trait]
impl IdentityVerificationStore for InMemoryStore {
    async fn create(
        &self,
        scope: &RequestScope,
        mut verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError> {
        let now = Utc::now();
        verification.verification_id = Uuid::new_v4();
        verification.organization_id = scope.organization_id;
        verification.created_utc = now;
        verification.updated_utc = now;

        self.lock()?
            .verifications
            .insert(verification.verification_id, verification.clone());
        Ok(verification)
    }

    async fn update(
        &self,
        scope: &RequestScope,
        mut verification: IdentityVerification,
    ) -> Result<IdentityVerification, ServiceError> {
        let mut state = self.lock()?;
        let existing = state
            .verifications
            .get_mut(&verification.verification_id)
            .filter(|v| v.organization_id == scope.organization_id)
            .ok_or(ServiceError::NotFound("Identity verification"))?;

        verification.organization_id = existing.organization_id;
        verification.created_utc = existing.created_utc;
        verification.updated_utc = Utc::now();
        *existing = verification.clone();
        Ok(verification)
    }

    async fn increment_try_count(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError> {
        let mut state = self.lock()?;
        let existing = state
            .verifications
            .get_mut(&verification_id)
            .filter(|v| v.organization_id == scope.organization_id)
            .ok_or(ServiceError::NotFound("Identity verification"))?;

        existing.try_count += 1;
        existing.updated_utc = Utc::now();
        Ok(existing.clone())
    }

    async fn transition_status(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        from: &[VerificationStatus],
        to: VerificationStatus,
    ) -> Result<IdentityVerification, ServiceError> {
        let mut state = self.lock()?;
        let existing = state
            .verifications
            .get_mut(&verification_id)
            .filter(|v| v.organization_id == scope.organization_id)
            .filter(|v| v.status().is_some_and(|status| from.contains(&status)))
            .ok_or(ServiceError::NotFound("Identity verification"))?;

        existing.set_status(to);
        existing.updated_utc = Utc::now();
        Ok(existing.clone())
    }

    async fn find_by_id(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
    ) -> Result<IdentityVerification, ServiceError> {
        self.lock()?
            .verifications
            .get(&verification_id)
            .filter(|v| v.organization_id == scope.organization_id)
            .cloned()
            .ok_or(ServiceError::NotFound("Identity verification"))
    }

    async fn find_by_id_and_unique_code(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        unique_code: &str,
    ) -> Result<IdentityVerification, ServiceError> {
        self.lock()?
            .verifications
            .get(&verification_id)
            .filter(|v| v.organization_id == scope.organization_id && v.unique_code == unique_code)
            .cloned()
            .ok_or(ServiceError::NotFound("Identity verification"))
    }
}
