//! User types and the request scope every lookup is bound to.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of principal behind a user record. Doubles as the portal "origin
/// type" a request arrives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserType {
    Customer,
    Company,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Customer => "CUSTOMER",
            UserType::Company => "COMPANY",
            UserType::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CUSTOMER" => Ok(UserType::Customer),
            "COMPANY" => Ok(UserType::Company),
            "ADMIN" => Ok(UserType::Admin),
            _ => Err(format!("Invalid user type: {}", s)),
        }
    }
}

/// Tenant and portal a request is bound to.
///
/// Passed explicitly to every store and service call; stores fold both
/// fields into their query predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestScope {
    pub organization_id: Uuid,
    pub origin_type: UserType,
}

impl RequestScope {
    pub fn new(organization_id: Uuid, origin_type: UserType) -> Self {
        Self {
            organization_id,
            origin_type,
        }
    }

    /// Same organization, different portal.
    pub fn with_origin(&self, origin_type: UserType) -> Self {
        Self {
            organization_id: self.organization_id,
            origin_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_type_case_insensitively() {
        assert_eq!("admin".parse::<UserType>(), Ok(UserType::Admin));
        assert_eq!(" Company ".parse::<UserType>(), Ok(UserType::Company));
        assert!("barista".parse::<UserType>().is_err());
    }

    #[test]
    fn user_type_serializes_uppercase() {
        let json = serde_json::to_string(&UserType::Customer).unwrap();
        assert_eq!(json, "\"CUSTOMER\"");
    }
}
