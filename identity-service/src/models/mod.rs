pub mod credential;
pub mod identity_verification;
pub mod role;
pub mod user;

pub use credential::{CreatedAccount, Credential, NewAccount, RoleProfile};
pub use identity_verification::{
    IdentityFor, IdentityType, IdentityVerification, VerificationStatus,
};
pub use role::RoleRecord;
pub use user::{RequestScope, UserType};
