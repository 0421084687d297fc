pub mod code;
pub mod password;
pub mod validation;

pub use code::generate_numeric_code;
pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedJson;
