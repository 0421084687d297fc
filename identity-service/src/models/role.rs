use uuid::Uuid;

use super::UserType;

/// Role-specific entity (admin, company or customer) linked to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub user_type: UserType,
}
