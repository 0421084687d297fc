//! Services layer for identity-service.
//!
//! Store traits with PostgreSQL and in-memory adapters, the orchestration
//! services built on them, and adapters for email and object storage.

mod account;
mod auth;
pub mod credential_store;
mod email;
pub mod error;
mod identity_verification;
mod jwt;
mod memory;
pub mod metrics;
mod recovery;
mod role_directory;
mod storage;
mod verification_store;

pub use account::{AccountService, LogoUpload, RoleSignUp, SignUpRequest, SignUpResult, MAX_LOGO_BYTES};
pub use auth::AuthService;
pub use credential_store::{CredentialStore, PgCredentialStore};
pub use email::{EmailProvider, EmailService, MockEmailService, SentEmail};
pub use error::ServiceError;
pub use identity_verification::IdentityVerificationService;
pub use jwt::{ClaimsContext, LoginResult, RoleClaim, SessionClaims, TokenIssuer};
pub use memory::InMemoryStore;
pub use recovery::{ForgotPasswordResult, PasswordRecoveryService};
pub use role_directory::{PgRoleDirectory, RoleDirectory};
pub use storage::{LocalStorage, ObjectStorage, S3Storage};
pub use verification_store::{IdentityVerificationStore, PgIdentityVerificationStore};
