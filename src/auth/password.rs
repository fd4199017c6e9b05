use std::sync::Arc;

use pbkdf2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Pbkdf2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Digest length in bytes, the SHA-256 output size.
const OUTPUT_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("pbkdf2 hash error: {0}")]
    Hash(String),
    #[error("malformed password hash: {0}")]
    Malformed(String),
}

pub fn hash_password(plain: &str, rounds: u32) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params {
        rounds,
        output_length: OUTPUT_LENGTH,
    };
    let hash = Pbkdf2
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| {
            error!(error = %e, "pbkdf2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Checks `plain` against a PHC-formatted PBKDF2 digest. The round count
/// and salt come from the digest itself.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "pbkdf2 parse hash error");
        PasswordError::Malformed(e.to_string())
    })?;
    Ok(Pbkdf2.verify_password(plain.as_bytes(), &parsed).is_ok())
}

/// Hashes with a fixed round count and keeps a throwaway digest around so
/// that a login for an unknown user costs the same as a wrong password.
#[derive(Clone)]
pub struct CredentialHasher {
    rounds: u32,
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    pub fn new(rounds: u32) -> Result<Self, PasswordError> {
        let dummy_hash = hash_password("dummy-password-for-timing", rounds)?;
        Ok(Self {
            rounds,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        hash_password(plain, self.rounds)
    }

    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        verify_password(plain, hash)
    }

    /// Burns one verification against the dummy digest; always false.
    pub fn verify_dummy(&self, plain: &str) -> bool {
        let _ = verify_password(plain, &self.dummy_hash);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUNDS: u32 = 1_000;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password, ROUNDS).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password, ROUNDS).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, PasswordError::Malformed(_)));
    }

    #[test]
    fn digest_is_salted_pbkdf2_sha256() {
        let a = hash_password("same-password", ROUNDS).unwrap();
        let b = hash_password("same-password", ROUNDS).unwrap();
        assert!(a.starts_with("$pbkdf2-sha256$"));
        assert!(a.contains("i=1000"));
        assert_ne!(a, b);
    }

    #[test]
    fn hasher_uses_configured_rounds() {
        let hasher = CredentialHasher::new(ROUNDS).unwrap();
        let hash = hasher.hash("hunter2hunter2").unwrap();
        assert!(hasher.verify("hunter2hunter2", &hash).unwrap());
        assert!(!hasher.verify_dummy("hunter2hunter2"));
    }
}
