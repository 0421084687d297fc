use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// Role-specific identifier carried in a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleClaim {
    Admin(Uuid),
    Company(Uuid),
    Customer(Uuid),
}

/// Identity facts collected during sign-in, before they are signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsContext {
    pub credential_id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: Option<RoleClaim>,
}

impl ClaimsContext {
    pub fn new(credential_id: Uuid, user_id: Uuid, organization_id: Uuid) -> Self {
        Self {
            credential_id,
            user_id,
            organization_id,
            role: None,
        }
    }

    pub fn with_role(mut self, role: RoleClaim) -> Self {
        self.role = Some(role);
        self
    }
}

/// Claims for session tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (credential ID)
    pub sub: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    pub organization_id: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    fn from_context(context: &ClaimsContext, issued: DateTime<Utc>, expires: DateTime<Utc>) -> Self {
        let mut claims = Self {
            sub: context.credential_id,
            user_id: context.user_id,
            admin_id: None,
            company_id: None,
            customer_id: None,
            organization_id: context.organization_id,
            iat: issued.timestamp(),
            exp: expires.timestamp(),
        };

        match context.role {
            Some(RoleClaim::Admin(id)) => claims.admin_id = Some(id),
            Some(RoleClaim::Company(id)) => claims.company_id = Some(id),
            Some(RoleClaim::Customer(id)) => claims.customer_id = Some(id),
            None => {}
        }

        claims
    }
}

/// Signed token handed back from sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub token: String,
    /// Expiry as decimal Unix seconds.
    pub expired_at: String,
    pub status: String,
}

/// Issues and validates HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!(expiry_hours = config.expiry_hours, "Token issuer initialized with HS256 secret");

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            expiry_hours: config.expiry_hours,
        }
    }

    pub fn expiry_hours(&self) -> i64 {
        self.expiry_hours
    }

    /// Sign `context` into a session token expiring `expiry_hours` from now.
    pub fn generate_token(&self, context: &ClaimsContext) -> Result<LoginResult, ServiceError> {
        let now = Utc::now();
        let expires = now + Duration::hours(self.expiry_hours);
        let claims = SessionClaims::from_context(context, now, expires);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::TokenSigning(e.to_string()))?;

        Ok(LoginResult {
            token,
            expired_at: claims.exp.to_string(),
            status: "success".to_string(),
        })
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token rejected");
                ServiceError::InvalidToken
            })?;

        Ok(token_data.claims)
    }
}
