//! Salted credential hashing for companies and users.
//!
//! Argon2id with a per-record salt; the resulting PHC string is what the
//! credential store persists. Verification never reconstructs the password.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::errors::{AnteroomError, Result};

/// Build the Argon2id hasher used for all credential operations.
///
/// Tuned for interactive login calls: moderate memory and a single iteration
/// keep verification under the latency budget on development hardware while
/// retaining side-channel protections.
pub fn password_hasher() -> Argon2<'static> {
    const MEMORY_COST_KIB: u32 = 768;
    const ITERATIONS: u32 = 1;
    const PARALLELISM: u32 = 1;
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, Some(32))
        .expect("valid Argon2 parameters");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Generate a fresh per-record salt.
pub fn generate_salt() -> SaltString {
    SaltString::generate(&mut OsRng)
}

/// Hash a password with the given salt, returning the PHC string to store.
pub fn hash_password(password: &str, salt: &SaltString) -> Result<String> {
    let hash = password_hasher()
        .hash_password(password.as_bytes(), salt)
        .map_err(|e| AnteroomError::internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a candidate password against a stored PHC string.
///
/// A mismatch is an `Ok(false)`, not an error; only a malformed stored hash
/// signals failure.
pub fn verify_password(candidate: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AnteroomError::internal(format!("Invalid stored password hash: {}", e)))?;
    Ok(password_hasher()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}
