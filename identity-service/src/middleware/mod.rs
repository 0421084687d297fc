pub mod admin;
pub mod auth;
pub mod scope;

pub use admin::admin_auth_middleware;
pub use auth::{auth_middleware, AuthUser};
pub use scope::{ORGANIZATION_ID_HEADER, ORIGIN_TYPE_HEADER};
