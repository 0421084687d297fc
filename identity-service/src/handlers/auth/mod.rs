pub mod password;
pub mod registration;
pub mod session;

pub use password::{change_password, forgot_password, reset_password, verify_identity};
pub use registration::{sign_up_admin, sign_up_company, sign_up_customer};
pub use session::sign_in;
