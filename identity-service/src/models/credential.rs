//! Credential model - username/password-hash pairs owned by a user.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use super::UserType;

/// Credential row joined with the owning user's type and email.
#[derive(Clone, FromRow)]
pub struct Credential {
    pub credential_id: Uuid,
    pub organization_id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub user_id: Uuid,
    pub user_type_code: String,
    pub email: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Credential {
    /// Owning user's type, if the stored code is recognised.
    pub fn user_type(&self) -> Option<UserType> {
        self.user_type_code.parse().ok()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("credential_id", &self.credential_id)
            .field("organization_id", &self.organization_id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("user_type_code", &self.user_type_code)
            .finish()
    }
}

/// Role-specific record created alongside a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleProfile {
    Customer {
        full_name: String,
    },
    Company {
        company_name: String,
        logo_location: Option<String>,
    },
    Admin,
}

impl RoleProfile {
    pub fn user_type(&self) -> UserType {
        match self {
            RoleProfile::Customer { .. } => UserType::Customer,
            RoleProfile::Company { .. } => UserType::Company,
            RoleProfile::Admin => UserType::Admin,
        }
    }
}

/// Everything needed to write a user, its role record and its credential.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub display_name: Option<String>,
    pub profile: RoleProfile,
}

/// Result of a successful account write.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub credential: Credential,
    pub role_id: Uuid,
}
