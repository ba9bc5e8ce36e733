//! Email-verification token management.

use campus_auth_core::types::{Identity, VerificationToken};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::OsRng;

use crate::{constant_time_eq, hash_token};

/// Length of the raw verification token.
const TOKEN_LENGTH: usize = 32;

/// Unambiguous alphabet for emailed tokens (no 0/O, 1/l/I).
const TOKEN_CHARSET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz";

/// Outcome of an email-verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailVerifyOutcome {
    /// The token matched; the address is now verified.
    Verified,
    /// The token did not match or has expired.
    InvalidOrExpired,
    /// The address was already verified; nothing changed.
    AlreadyVerified,
}

/// Issues and validates email-verification tokens on an identity.
#[derive(Debug, Clone)]
pub struct EmailVerifier {
    ttl: Duration,
}

impl Default for EmailVerifier {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
        }
    }
}

impl EmailVerifier {
    /// Creates a verifier with a custom token lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Generates a fresh token, stores its hash and expiry on the identity
    /// (one active token; a reissue replaces the previous one), and returns
    /// the raw token for delivery.
    pub fn issue(&self, identity: &mut Identity, now: DateTime<Utc>) -> String {
        let token: String = (0..TOKEN_LENGTH)
            .map(|_| {
                let idx = OsRng.gen_range(0..TOKEN_CHARSET.len());
                TOKEN_CHARSET[idx] as char
            })
            .collect();
        identity.email_verification = Some(VerificationToken {
            token_hash: hash_token(&token),
            expires_at: now + self.ttl,
        });
        identity.touch();
        token
    }

    /// Validates a submitted token. Success marks the email verified and
    /// clears the token.
    pub fn verify(
        &self,
        identity: &mut Identity,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> EmailVerifyOutcome {
        if identity.email_verified {
            return EmailVerifyOutcome::AlreadyVerified;
        }

        let Some(token) = &identity.email_verification else {
            return EmailVerifyOutcome::InvalidOrExpired;
        };

        if token.is_expired(now) {
            identity.email_verification = None;
            identity.touch();
            return EmailVerifyOutcome::InvalidOrExpired;
        }

        if !constant_time_eq(&token.token_hash, &hash_token(submitted.trim())) {
            return EmailVerifyOutcome::InvalidOrExpired;
        }

        identity.email_verified = true;
        identity.email_verification = None;
        identity.touch();
        EmailVerifyOutcome::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_auth_core::types::UserRole;

    fn identity() -> Identity {
        Identity::new("jdoe", "jdoe@campus.test", "$2b$12$hash", UserRole::Lecturer)
    }

    #[test]
    fn test_verify_round_trip() {
        let verifier = EmailVerifier::default();
        let mut identity = identity();
        let now = Utc::now();

        let token = verifier.issue(&mut identity, now);
        assert_eq!(
            verifier.verify(&mut identity, &token, now),
            EmailVerifyOutcome::Verified
        );
        assert!(identity.email_verified);
        assert!(identity.email_verification.is_none());
    }

    #[test]
    fn test_already_verified_wins_over_token_state() {
        let verifier = EmailVerifier::default();
        let mut identity = identity();
        let now = Utc::now();

        let token = verifier.issue(&mut identity, now);
        verifier.verify(&mut identity, &token, now);

        // A second attempt, even with the right (now cleared) token.
        assert_eq!(
            verifier.verify(&mut identity, &token, now),
            EmailVerifyOutcome::AlreadyVerified
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = EmailVerifier::default();
        let mut identity = identity();
        let now = Utc::now();

        let token = verifier.issue(&mut identity, now);
        let late = now + Duration::hours(24) + Duration::seconds(1);
        assert_eq!(
            verifier.verify(&mut identity, &token, late),
            EmailVerifyOutcome::InvalidOrExpired
        );
        assert!(!identity.email_verified);
    }

    #[test]
    fn test_wrong_token_rejected() {
        let verifier = EmailVerifier::default();
        let mut identity = identity();
        let now = Utc::now();

        verifier.issue(&mut identity, now);
        assert_eq!(
            verifier.verify(&mut identity, "definitely-wrong", now),
            EmailVerifyOutcome::InvalidOrExpired
        );
        // Mismatch leaves the token so the real link still works.
        assert!(identity.email_verification.is_some());
    }
}
