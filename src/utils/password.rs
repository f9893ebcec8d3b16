use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Hash a password using Argon2id.
///
/// The salt is generated per call and encoded into the returned PHC
/// string, so two hashes of the same password differ.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?
        .to_string();

    Ok(hash)
}

/// Verify a password against a stored hash.
///
/// Constant-time with respect to the digest. A stored hash that fails to
/// parse verifies as `false` rather than erroring; a caller cannot learn
/// anything about the stored value either way.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_produces_argon2_phc_string() {
        let hash = hash_password("mySecurePassword123").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn correct_password_verifies() {
        let hash = hash_password("mySecurePassword123").unwrap();
        assert!(verify_password("mySecurePassword123", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("mySecurePassword123").unwrap();
        assert!(!verify_password("wrongPassword", &hash));
    }

    #[test]
    fn malformed_hash_fails_instead_of_erroring() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let h1 = hash_password("repeat").unwrap();
        let h2 = hash_password("repeat").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("repeat", &h1));
        assert!(verify_password("repeat", &h2));
    }
}
