use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::fmt;

/// Plaintext password. Never printed.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// PHC-encoded Argon2 hash as stored in `credentials.password_hash`.
#[derive(Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for PasswordHashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHashString(<redacted>)")
    }
}

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Argon2id with a fresh random salt embedded in the PHC string.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map(|hash| PasswordHashString::new(hash.to_string()))
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

/// `Ok(())` only when `password` matches. A stored hash that is not valid
/// PHC is an error too; parameters are read from the hash itself.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Stored password hash is malformed: {}", e))?;

    hasher()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .map_err(|_| anyhow::anyhow!("Password does not match"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = Password::new("Secret123!");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2id"));
        assert!(!hash.as_str().contains("Secret123!"));
    }

    #[test]
    fn test_verify_password_correct() {
        let password = Password::new("Secret123!");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(verify_password(&password, &hash).is_ok());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let password = Password::new("Secret123!");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(verify_password(&Password::new("wrong"), &hash).is_err());
    }

    #[test]
    fn test_malformed_hash_fails_verification() {
        let hash = PasswordHashString::new("not-a-phc-string");
        assert!(verify_password(&Password::new("Secret123!"), &hash).is_err());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let password = Password::new("Secret123!");
        let hash1 = hash_password(&password).expect("Failed to hash password");
        let hash2 = hash_password(&password).expect("Failed to hash password");

        // Random salt per hash
        assert_ne!(hash1.as_str(), hash2.as_str());
        assert!(verify_password(&password, &hash1).is_ok());
        assert!(verify_password(&password, &hash2).is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let password = Password::new("Secret123!");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(!format!("{:?}", password).contains("Secret"));
        assert!(!format!("{:?}", hash).contains("argon2"));
    }
}
