//! Password recovery: one-time code issuance, identity verification and reset.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    models::{IdentityFor, IdentityType, IdentityVerification, RequestScope, VerificationStatus},
    services::{CredentialStore, EmailProvider, IdentityVerificationService, ServiceError},
    utils::{generate_numeric_code, hash_password, code::VERIFICATION_CODE_LENGTH, Password},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgotPasswordResult {
    pub verification_id: Uuid,
    pub expired_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PasswordRecoveryService {
    credentials: Arc<dyn CredentialStore>,
    verifications: IdentityVerificationService,
    email: Arc<dyn EmailProvider>,
    code_ttl_minutes: i64,
}

impl PasswordRecoveryService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        verifications: IdentityVerificationService,
        email: Arc<dyn EmailProvider>,
        code_ttl_minutes: i64,
    ) -> Self {
        Self {
            credentials,
            verifications,
            email,
            code_ttl_minutes,
        }
    }

    /// Start a password reset for the account registered under `email`.
    ///
    /// Unknown addresses get a well-formed but unusable verification id, so
    /// the response does not reveal whether the address is registered.
    pub async fn forgot_password(
        &self,
        scope: &RequestScope,
        email: &str,
    ) -> Result<ForgotPasswordResult, ServiceError> {
        let ttl = Duration::minutes(self.code_ttl_minutes);

        let credential = match self.credentials.find_by_email(scope, email).await {
            Ok(credential) => credential,
            Err(ServiceError::CredentialNotFound) => {
                tracing::info!(
                    organization_id = %scope.organization_id,
                    "Password reset requested for unknown email"
                );
                return Ok(ForgotPasswordResult {
                    verification_id: Uuid::new_v4(),
                    expired_at: Utc::now() + ttl,
                });
            }
            Err(e) => return Err(e),
        };

        let code = generate_numeric_code(VERIFICATION_CODE_LENGTH);
        let challenge = IdentityVerification::new(
            credential.user_id,
            IdentityFor::PasswordReset,
            IdentityType::Email,
            credential.email.clone(),
            code.clone(),
            ttl,
            serde_json::json!({ "username": credential.username }),
        );

        let stored = self.verifications.create(scope, challenge).await?;

        self.email
            .send_verification_code(
                &credential.email,
                &code,
                IdentityFor::PasswordReset,
                self.code_ttl_minutes,
            )
            .await?;

        Ok(ForgotPasswordResult {
            verification_id: stored.verification_id,
            expired_at: stored.expired_utc,
        })
    }

    /// Check a submitted code and mark the challenge verified.
    pub async fn verify_identity(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        code: &str,
    ) -> Result<IdentityVerification, ServiceError> {
        let challenge = self.open_challenge(scope, verification_id, code).await?;

        let challenge = if challenge.status() == Some(VerificationStatus::Verified) {
            challenge
        } else {
            self.verifications
                .transition_status(
                    scope,
                    verification_id,
                    &[VerificationStatus::Pending],
                    VerificationStatus::Verified,
                )
                .await
                .map_err(closed_if_not_found)?
        };

        tracing::info!(verification_id = %verification_id, "Identity verified");
        Ok(challenge)
    }

    /// Close the challenge, then set a new password on every credential
    /// owned by its user.
    ///
    /// Closing first means two resets racing on the same code cannot both
    /// get through.
    pub async fn reset_password(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        code: &str,
        new_password: &Password,
    ) -> Result<(), ServiceError> {
        let challenge = self.open_challenge(scope, verification_id, code).await?;

        if challenge.identity_for_code != IdentityFor::PasswordReset.as_str() {
            return Err(ServiceError::VerificationClosed);
        }

        let new_hash = hash_password(new_password).map_err(ServiceError::Internal)?;

        self.verifications
            .transition_status(
                scope,
                verification_id,
                &[VerificationStatus::Pending, VerificationStatus::Verified],
                VerificationStatus::Expired,
            )
            .await
            .map_err(closed_if_not_found)?;

        let credentials = self
            .credentials
            .find_all_by_user_id(scope, challenge.user_id)
            .await?;
        if credentials.is_empty() {
            return Err(ServiceError::NotFound("Credential"));
        }

        for credential in &credentials {
            self.credentials
                .change_password(scope, credential.credential_id, new_hash.as_str())
                .await?;
        }

        tracing::info!(
            verification_id = %verification_id,
            credentials = credentials.len(),
            "Password reset completed"
        );
        Ok(())
    }

    /// Shared gate: the code must match exactly and the challenge must be
    /// unexpired and still pending or verified.
    ///
    /// An unknown id fails exactly like a wrong code, so ids handed out for
    /// unregistered emails cannot be told apart from real ones.
    async fn open_challenge(
        &self,
        scope: &RequestScope,
        verification_id: Uuid,
        code: &str,
    ) -> Result<IdentityVerification, ServiceError> {
        let challenge = match self
            .verifications
            .find_by_id_and_unique_code(scope, verification_id, code)
            .await
        {
            Ok(challenge) => challenge,
            Err(ServiceError::NotFound(_)) => {
                match self
                    .verifications
                    .increment_try_count(scope, verification_id)
                    .await
                {
                    Ok(_) | Err(ServiceError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
                tracing::warn!(verification_id = %verification_id, "Invalid verification code");
                return Err(ServiceError::InvalidVerificationCode);
            }
            Err(e) => return Err(e),
        };

        if challenge.is_expired() {
            match self
                .verifications
                .transition_status(
                    scope,
                    verification_id,
                    &[VerificationStatus::Pending, VerificationStatus::Verified],
                    VerificationStatus::Expired,
                )
                .await
            {
                Ok(_) | Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            return Err(ServiceError::VerificationExpired);
        }

        if !challenge.is_open() {
            return Err(ServiceError::VerificationClosed);
        }

        Ok(challenge)
    }
}

/// A guarded transition that matched no row lost a race with another close.
fn closed_if_not_found(err: ServiceError) -> ServiceError {
    match err {
        ServiceError::NotFound(_) => ServiceError::VerificationClosed,
        other => other,
    }
}
