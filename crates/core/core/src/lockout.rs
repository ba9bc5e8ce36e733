//! Progressive lockout tracking.
//!
//! Every verification stage (password, TOTP, recovery code) shares one
//! failed-attempt counter per identity. Reaching the threshold locks the
//! account for a fixed window during which no verifier runs at all, so
//! probing cannot extend the lockout.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AuthResult;
use crate::traits::{Clock, CredentialStore};
use crate::types::Identity;

/// Outcome of consulting the lockout gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Verification may proceed.
    Allowed,
    /// The account is locked; no verifier may be invoked before `until`.
    Denied { until: DateTime<Utc> },
}

/// Threshold and window for the lockout state machine.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a lockout.
    pub max_failures: u32,
    /// How long a triggered lockout lasts.
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            duration: Duration::minutes(15),
        }
    }
}

impl LockoutPolicy {
    /// Creates a new policy.
    pub fn new(max_failures: u32, duration: Duration) -> Self {
        Self {
            max_failures,
            duration,
        }
    }

    /// Consults the gate for an identity at the given instant.
    ///
    /// An elapsed lockout is treated as unlocked without touching the
    /// stored fields (lazy expiry); they are cleared on the next recorded
    /// success.
    pub fn gate(&self, identity: &Identity, now: DateTime<Utc>) -> Gate {
        match identity.lockout_until {
            Some(until) if until > now => Gate::Denied { until },
            _ => Gate::Allowed,
        }
    }
}

/// Store-backed failure/success bookkeeping on top of [`LockoutPolicy`].
pub struct LockoutTracker {
    policy: LockoutPolicy,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl LockoutTracker {
    /// Creates a new tracker.
    pub fn new(policy: LockoutPolicy, store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            store,
            clock,
        }
    }

    /// The policy in effect.
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Consults the gate. Must be called before any verifier; a denied gate
    /// means stop without incrementing anything.
    pub fn gate(&self, identity: &Identity) -> Gate {
        self.policy.gate(identity, self.clock.now())
    }

    /// Records a failed verification attempt. Transitions to locked when
    /// the counter reaches the threshold and reports the resulting gate.
    pub async fn record_failure(&self, user_id: &str) -> AuthResult<Gate> {
        let count = self.store.record_failed_attempt(user_id).await?;
        if count >= self.policy.max_failures {
            let until = self.clock.now() + self.policy.duration;
            self.store.set_lockout(user_id, Some(until)).await?;
            warn!(user_id, failed_attempts = count, %until, "account locked out");
            return Ok(Gate::Denied { until });
        }
        info!(user_id, failed_attempts = count, "failed verification attempt");
        Ok(Gate::Allowed)
    }

    /// Records a successful full authentication: counter back to zero,
    /// lockout cleared.
    pub async fn record_success(&self, user_id: &str) -> AuthResult<()> {
        self.store.clear_failed_attempts(user_id).await?;
        self.store.set_lockout(user_id, None).await?;
        Ok(())
    }
}
