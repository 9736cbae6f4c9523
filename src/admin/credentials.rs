//! Credential generation and one-way derivation.
//!
//! Passwords and client secrets are stored as Argon2id PHC strings with a
//! random salt.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::prelude::*;
use rand::Rng;
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::errors::CredentialError;

/// Generate a secure random token (32 bytes, base64url without padding)
pub fn generate_token() -> String {
    let bytes: [u8; 32] = OsRng.r#gen();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a client ID
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a user ID
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

/// Derive a non-reversible credential from a plaintext value
pub fn hash_secret(plain: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "argon2 hash_password error");
            CredentialError::HashingFailed(e.to_string())
        })
}

/// Check a plaintext value against a stored credential
pub fn verify_secret(plain: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| CredentialError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// [`hash_secret`] on the blocking pool so Argon2 does not stall the executor
pub async fn derive_credential(plain: String) -> Result<String, CredentialError> {
    tokio::task::spawn_blocking(move || hash_secret(&plain))
        .await
        .map_err(|e| CredentialError::HashingFailed(format!("hashing task failed: {}", e)))?
}

/// [`verify_secret`] on the blocking pool
pub async fn check_credential(plain: String, hash: String) -> Result<bool, CredentialError> {
    tokio::task::spawn_blocking(move || verify_secret(&plain, &hash))
        .await
        .map_err(|e| CredentialError::HashingFailed(format!("verification task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_secret("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("correct-horse"));
        assert!(verify_secret("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_secret("wrong-password", &hash).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_secret("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, CredentialError::MalformedHash(_)));
    }

    #[test]
    fn generated_values_are_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert_ne!(generate_client_id(), generate_client_id());
    }

    #[tokio::test]
    async fn blocking_pool_wrappers() {
        let hash = derive_credential("hunter22hunter22".to_string()).await.unwrap();
        assert!(check_credential("hunter22hunter22".to_string(), hash).await.unwrap());
    }
}
