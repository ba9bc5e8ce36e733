//! # Campus Auth Email Token Plugin
//!
//! One-time tokens delivered out-of-band by email: the 6-digit password
//! reset PIN and the email-verification token. Both are stored hashed with
//! an expiry; the raw value exists only in the outbound notification.

mod reset;
mod verify;

pub use reset::ResetPinManager;
pub use verify::{EmailVerifier, EmailVerifyOutcome};

use sha2::{Digest, Sha256};

/// SHA-256 hex digest used for at-rest storage of token values.
pub(crate) fn hash_token(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Constant-time equality over two hex digests.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("042137");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("042137"));
        assert_ne!(digest, hash_token("042138"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abcd", "abcd"));
        assert!(!constant_time_eq("abcd", "abce"));
        assert!(!constant_time_eq("abcd", "abcde"));
    }
}
