//! Password-reset PIN management.
//!
//! PINs are 6-digit fixed-width numeric strings (leading zeros preserved),
//! uniformly random, hashed before storage, and expire five minutes after
//! issue. A successful validation consumes the PIN; a mismatch leaves the
//! record in place so the user can retry until it expires.

use campus_auth_core::types::{Identity, ResetPin};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::OsRng;

use crate::{constant_time_eq, hash_token};

/// Width of the reset PIN. The PIN is a string, not an integer: "042137"
/// must keep its leading zero.
const PIN_DIGITS: usize = 6;

/// Issues and validates password-reset PINs on an identity.
#[derive(Debug, Clone)]
pub struct ResetPinManager {
    ttl: Duration,
}

impl Default for ResetPinManager {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
        }
    }
}

impl ResetPinManager {
    /// Creates a manager with a custom PIN lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// The configured PIN lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generates a fresh PIN, stores its hash and expiry on the identity
    /// (replacing any previous PIN, so at most one is ever active), and
    /// returns the raw PIN for delivery.
    pub fn issue(&self, identity: &mut Identity, now: DateTime<Utc>) -> String {
        let pin = format!("{:0width$}", OsRng.gen_range(0..1_000_000u32), width = PIN_DIGITS);
        identity.reset_pin = Some(ResetPin {
            pin_hash: hash_token(&pin),
            expires_at: now + self.ttl,
        });
        identity.touch();
        pin
    }

    /// Validates a submitted PIN.
    ///
    /// True iff the hash matches and the PIN has not expired; the PIN is
    /// consumed on success. An expired PIN is cleared on presentation; a
    /// mismatched one is left untouched for retry.
    pub fn validate(&self, identity: &mut Identity, submitted: &str, now: DateTime<Utc>) -> bool {
        let Some(pin) = &identity.reset_pin else {
            return false;
        };

        if pin.is_expired(now) {
            identity.reset_pin = None;
            identity.touch();
            return false;
        }

        if !constant_time_eq(&pin.pin_hash, &hash_token(submitted.trim())) {
            return false;
        }

        identity.reset_pin = None;
        identity.touch();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_auth_core::types::UserRole;

    fn identity() -> Identity {
        Identity::new("jdoe", "jdoe@campus.test", "$2b$12$hash", UserRole::Student)
    }

    #[test]
    fn test_pin_is_six_digits_fixed_width() {
        let manager = ResetPinManager::default();
        let mut identity = identity();
        for _ in 0..50 {
            let pin = manager.issue(&mut identity, Utc::now());
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_pin_accepted_once() {
        let manager = ResetPinManager::default();
        let mut identity = identity();
        let now = Utc::now();

        let pin = manager.issue(&mut identity, now);
        assert!(manager.validate(&mut identity, &pin, now));
        // Consumed: the same PIN is rejected the second time.
        assert!(!manager.validate(&mut identity, &pin, now));
        assert!(identity.reset_pin.is_none());
    }

    #[test]
    fn test_pin_rejected_after_expiry() {
        let manager = ResetPinManager::default();
        let mut identity = identity();
        let now = Utc::now();

        let pin = manager.issue(&mut identity, now);
        let late = now + Duration::minutes(5) + Duration::seconds(1);
        assert!(!manager.validate(&mut identity, &pin, late));
        assert!(identity.reset_pin.is_none());
    }

    #[test]
    fn test_mismatch_leaves_pin_for_retry() {
        let manager = ResetPinManager::default();
        let mut identity = identity();
        let now = Utc::now();

        let pin = manager.issue(&mut identity, now);
        let wrong = if pin == "000000" { "000001" } else { "000000" };
        assert!(!manager.validate(&mut identity, wrong, now));
        assert!(identity.reset_pin.is_some());
        assert!(manager.validate(&mut identity, &pin, now));
    }

    #[test]
    fn test_reissue_replaces_previous_pin() {
        let manager = ResetPinManager::default();
        let mut identity = identity();
        let now = Utc::now();

        let first = manager.issue(&mut identity, now);
        let second = manager.issue(&mut identity, now);
        if first != second {
            assert!(!manager.validate(&mut identity, &first, now));
        }
        assert!(manager.validate(&mut identity, &second, now));
    }

    #[test]
    fn test_pin_never_stored_in_cleartext() {
        let manager = ResetPinManager::default();
        let mut identity = identity();
        let pin = manager.issue(&mut identity, Utc::now());
        let stored = identity.reset_pin.as_ref().map(|p| p.pin_hash.clone());
        assert_ne!(stored.as_deref(), Some(pin.as_str()));
    }
}
