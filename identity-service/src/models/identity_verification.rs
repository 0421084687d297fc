//! Identity verification challenge - a one-time code proving control of an
//! email address or phone number.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// What the verified identity unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityFor {
    PasswordReset,
}

impl IdentityFor {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityFor::PasswordReset => "PASSWORD_RESET",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentityType {
    Email,
    Phone,
}

impl IdentityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::Email => "EMAIL",
            IdentityType::Phone => "PHONE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Expired,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "PENDING",
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::Expired => "EXPIRED",
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VerificationStatus::Pending),
            "VERIFIED" => Ok(VerificationStatus::Verified),
            "EXPIRED" => Ok(VerificationStatus::Expired),
            _ => Err(format!("Invalid verification status: {}", s)),
        }
    }
}

/// Verification challenge entity.
#[derive(Clone, FromRow)]
pub struct IdentityVerification {
    pub verification_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub identity_for_code: String,
    pub identity_type_code: String,
    pub identity: String,
    pub unique_code: String,
    pub try_count: i32,
    pub expired_utc: DateTime<Utc>,
    pub status_code: String,
    pub data: serde_json::Value,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl IdentityVerification {
    /// Build a pending challenge. Id and organization are assigned by the
    /// store on insert.
    pub fn new(
        user_id: Uuid,
        identity_for: IdentityFor,
        identity_type: IdentityType,
        identity: String,
        unique_code: String,
        ttl: Duration,
        data: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            verification_id: Uuid::nil(),
            organization_id: Uuid::nil(),
            user_id,
            identity_for_code: identity_for.as_str().to_string(),
            identity_type_code: identity_type.as_str().to_string(),
            identity,
            unique_code,
            try_count: 0,
            expired_utc: now + ttl,
            status_code: VerificationStatus::Pending.as_str().to_string(),
            data,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn status(&self) -> Option<VerificationStatus> {
        self.status_code.parse().ok()
    }

    pub fn set_status(&mut self, status: VerificationStatus) {
        self.status_code = status.as_str().to_string();
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expired_utc
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Still usable: not past expiry and neither closed nor marked expired.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status(),
            Some(VerificationStatus::Pending | VerificationStatus::Verified)
        ) && !self.is_expired()
    }
}

impl fmt::Debug for IdentityVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityVerification")
            .field("verification_id", &self.verification_id)
            .field("organization_id", &self.organization_id)
            .field("user_id", &self.user_id)
            .field("identity_for_code", &self.identity_for_code)
            .field("identity_type_code", &self.identity_type_code)
            .field("unique_code", &"<redacted>")
            .field("try_count", &self.try_count)
            .field("expired_utc", &self.expired_utc)
            .field("status_code", &self.status_code)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(ttl: Duration) -> IdentityVerification {
        IdentityVerification::new(
            Uuid::new_v4(),
            IdentityFor::PasswordReset,
            IdentityType::Email,
            "a@b.com".to_string(),
            "123456".to_string(),
            ttl,
            serde_json::json!({}),
        )
    }

    #[test]
    fn new_challenge_is_pending_and_open() {
        let c = challenge(Duration::minutes(15));
        assert_eq!(c.status(), Some(VerificationStatus::Pending));
        assert_eq!(c.try_count, 0);
        assert!(c.is_open());
    }

    #[test]
    fn challenge_past_expiry_is_not_open() {
        let c = challenge(Duration::minutes(-1));
        assert!(c.is_expired());
        assert!(!c.is_open());
    }

    #[test]
    fn expired_status_closes_challenge() {
        let mut c = challenge(Duration::minutes(15));
        c.set_status(VerificationStatus::Expired);
        assert!(!c.is_open());
    }

    #[test]
    fn debug_output_hides_code() {
        let c = challenge(Duration::minutes(15));
        assert!(!format!("{:?}", c).contains("123456"));
    }
}
