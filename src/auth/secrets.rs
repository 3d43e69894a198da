//! Generation and comparison of the short-lived secrets the core hands out:
//! session bearer tokens and one-time invitation codes.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// Number of random bytes in a session token (64 bytes = 512 bits of entropy).
pub const SESSION_TOKEN_BYTES: usize = 64;

/// Generate a fixed-length, high-entropy session bearer token.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a room-entry code from the mixed-case alphanumeric alphabet.
pub fn generate_invite_code(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Full-string comparison of a supplied secret against the stored one without
/// early exit on the first differing byte.
pub fn constant_time_eq(supplied: &str, stored: &str) -> bool {
    ring::constant_time::verify_slices_are_equal(supplied.as_bytes(), stored.as_bytes()).is_ok()
}
