use std::sync::Arc;
use uuid::Uuid;

use crate::{
    models::{NewAccount, RequestScope, RoleProfile, UserType},
    services::{CredentialStore, ObjectStorage, ServiceError},
    utils::{hash_password, Password},
};

pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

/// Logo file attached to a company sign-up.
#[derive(Debug, Clone)]
pub struct LogoUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl LogoUpload {
    fn extension(&self) -> Result<&'static str, ServiceError> {
        match self.content_type.as_str() {
            "image/png" => Ok("png"),
            "image/jpeg" | "image/jpg" => Ok("jpg"),
            "image/webp" => Ok("webp"),
            "image/svg+xml" => Ok("svg"),
            other => Err(ServiceError::Validation(format!(
                "Unsupported logo content type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RoleSignUp {
    Customer { full_name: String },
    Company {
        company_name: String,
        logo: Option<LogoUpload>,
    },
    Admin,
}

impl RoleSignUp {
    pub fn user_type(&self) -> UserType {
        match self {
            RoleSignUp::Customer { .. } => UserType::Customer,
            RoleSignUp::Company { .. } => UserType::Company,
            RoleSignUp::Admin => UserType::Admin,
        }
    }
}

#[derive(Debug)]
pub struct SignUpRequest {
    pub username: String,
    pub password: Password,
    pub email: String,
    pub display_name: Option<String>,
    pub role: RoleSignUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpResult {
    pub credential_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub user_type: UserType,
}

/// Stored logo object, kept so a failed account write can remove it.
struct StoredLogo {
    key: String,
    location: String,
}

#[derive(Clone)]
pub struct AccountService {
    credentials: Arc<dyn CredentialStore>,
    storage: Arc<dyn ObjectStorage>,
    logo_bucket: String,
}

impl AccountService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        storage: Arc<dyn ObjectStorage>,
        logo_bucket: String,
    ) -> Self {
        Self {
            credentials,
            storage,
            logo_bucket,
        }
    }

    pub async fn sign_up(
        &self,
        scope: &RequestScope,
        req: SignUpRequest,
    ) -> Result<SignUpResult, ServiceError> {
        let user_type = req.role.user_type();
        if user_type != scope.origin_type {
            return Err(ServiceError::Validation(format!(
                "Cannot sign up a {} account from the {} portal",
                user_type, scope.origin_type
            )));
        }

        let password_hash = hash_password(&req.password).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let (profile, logo) = match req.role {
            RoleSignUp::Customer { full_name } => (RoleProfile::Customer { full_name }, None),
            RoleSignUp::Admin => (RoleProfile::Admin, None),
            RoleSignUp::Company { company_name, logo } => {
                let stored = match logo {
                    Some(logo) => Some(self.store_logo(scope, logo).await?),
                    None => None,
                };
                let profile = RoleProfile::Company {
                    company_name,
                    logo_location: stored.as_ref().map(|s| s.location.clone()),
                };
                (profile, stored)
            }
        };

        let account = NewAccount {
            username: req.username,
            password_hash: password_hash.into_string(),
            email: req.email,
            display_name: req.display_name,
            profile,
        };

        let created = match self.credentials.create_account(scope, account).await {
            Ok(created) => created,
            Err(err) => {
                if let Some(logo) = logo {
                    self.discard_logo(&logo).await;
                }
                return Err(err);
            }
        };

        tracing::info!(
            user_id = %created.credential.user_id,
            user_type = %user_type,
            organization_id = %scope.organization_id,
            "User signed up"
        );

        Ok(SignUpResult {
            credential_id: created.credential.credential_id,
            user_id: created.credential.user_id,
            role_id: created.role_id,
            user_type,
        })
    }

    async fn store_logo(
        &self,
        scope: &RequestScope,
        logo: LogoUpload,
    ) -> Result<StoredLogo, ServiceError> {
        if logo.bytes.is_empty() {
            return Err(ServiceError::Validation("Logo file is empty".to_string()));
        }
        if logo.bytes.len() > MAX_LOGO_BYTES {
            return Err(ServiceError::Validation(format!(
                "Logo exceeds {} bytes",
                MAX_LOGO_BYTES
            )));
        }

        let key = format!(
            "{}/{}.{}",
            scope.organization_id,
            Uuid::new_v4(),
            logo.extension()?
        );
        let location = self
            .storage
            .upload(logo.bytes, &self.logo_bucket, &key, &logo.content_type)
            .await?;

        Ok(StoredLogo { key, location })
    }

    async fn discard_logo(&self, logo: &StoredLogo) {
        if let Err(e) = self.storage.delete(&self.logo_bucket, &logo.key).await {
            tracing::warn!(error = %e, key = %logo.key, "Failed to remove orphaned logo");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryStore, LocalStorage};
    use tempfile::TempDir;

    async fn setup() -> (AccountService, Arc<InMemoryStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let store = Arc::new(InMemoryStore::new());
        let service = AccountService::new(store.clone(), Arc::new(storage), "logos".to_string());
        (service, store, dir)
    }

    fn company_request(username: &str, logo: Option<LogoUpload>) -> SignUpRequest {
        SignUpRequest {
            username: username.to_string(),
            password: Password::new("Secret123!"),
            email: format!("{}@example.com", username),
            display_name: None,
            role: RoleSignUp::Company {
                company_name: "Acme Roasters".to_string(),
                logo,
            },
        }
    }

    fn png() -> LogoUpload {
        LogoUpload {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".to_string(),
        }
    }

    fn files_under(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| {
                        let path = e.path();
                        if path.is_dir() {
                            files_under(&path)
                        } else {
                            1
                        }
                    })
                    .sum()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn origin_must_match_role() {
        let (service, _, _dir) = setup().await;
        let scope = RequestScope::new(Uuid::new_v4(), UserType::Customer);

        let result = service.sign_up(&scope, company_request("acme", None)).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn company_logo_is_stored() {
        let (service, _, dir) = setup().await;
        let scope = RequestScope::new(Uuid::new_v4(), UserType::Company);

        let result = service
            .sign_up(&scope, company_request("acme", Some(png())))
            .await
            .unwrap();

        assert_eq!(result.user_type, UserType::Company);
        assert_eq!(files_under(dir.path()), 1);
    }

    #[tokio::test]
    async fn logo_is_removed_when_account_write_fails() {
        let (service, _, dir) = setup().await;
        let scope = RequestScope::new(Uuid::new_v4(), UserType::Company);

        service
            .sign_up(&scope, company_request("acme", None))
            .await
            .unwrap();
        let result = service
            .sign_up(&scope, company_request("acme", Some(png())))
            .await;

        assert!(result.is_err());
        assert_eq!(files_under(dir.path()), 0);
    }

    #[tokio::test]
    async fn unsupported_logo_type_is_rejected() {
        let (service, _, _dir) = setup().await;
        let scope = RequestScope::new(Uuid::new_v4(), UserType::Company);
        let logo = LogoUpload {
            bytes: b"GIF89a".to_vec(),
            content_type: "image/gif".to_string(),
        };

        let result = service
            .sign_up(&scope, company_request("acme", Some(logo)))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
