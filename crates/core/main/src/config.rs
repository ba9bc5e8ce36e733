//! Top-level configuration for the authentication service.

use campus_auth_core::LockoutPolicy;
use campus_auth_plugin_password::PasswordPolicy;
use campus_auth_plugin_two_factor::TwoFactorConfig;
use chrono::Duration;

/// Configuration for [`AuthService`](crate::AuthService).
///
/// Every knob has a production default; tests typically lower `bcrypt_cost`
/// and nothing else.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Two-factor settings (issuer, TOTP, recovery codes, device trust).
    pub two_factor: TwoFactorConfig,
    /// Lockout threshold and window.
    pub lockout: LockoutPolicy,
    /// Password strength requirements.
    pub password_policy: PasswordPolicy,
    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    /// Lifetime of a non-persistent session. Default: 12 hours.
    pub session_lifetime: Duration,
    /// Lifetime of a "remember me" session. Default: 30 days.
    pub persistent_session_lifetime: Duration,
    /// How long a pending second-factor challenge stays answerable.
    /// Default: 5 minutes.
    pub pending_login_ttl: Duration,
    /// How long an unconfirmed two-factor enrollment stays confirmable.
    /// Default: 10 minutes.
    pub pending_setup_ttl: Duration,
    /// Password-reset PIN lifetime. Default: 5 minutes.
    pub reset_pin_ttl: Duration,
    /// Email-verification token lifetime. Default: 24 hours.
    pub email_token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            two_factor: TwoFactorConfig::default(),
            lockout: LockoutPolicy::default(),
            password_policy: PasswordPolicy::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            session_lifetime: Duration::hours(12),
            persistent_session_lifetime: Duration::days(30),
            pending_login_ttl: Duration::minutes(5),
            pending_setup_ttl: Duration::minutes(10),
            reset_pin_ttl: Duration::minutes(5),
            email_token_ttl: Duration::hours(24),
        }
    }
}

impl AuthConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the two-factor configuration.
    pub fn two_factor(mut self, config: TwoFactorConfig) -> Self {
        self.two_factor = config;
        self
    }

    /// Sets the lockout policy.
    pub fn lockout(mut self, policy: LockoutPolicy) -> Self {
        self.lockout = policy;
        self
    }

    /// Sets the password policy.
    pub fn password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    /// Sets the bcrypt work factor.
    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Sets the non-persistent session lifetime.
    pub fn session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    /// Sets the "remember me" session lifetime.
    pub fn persistent_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.persistent_session_lifetime = lifetime;
        self
    }

    /// Sets the pending second-factor challenge lifetime.
    pub fn pending_login_ttl(mut self, ttl: Duration) -> Self {
        self.pending_login_ttl = ttl;
        self
    }

    /// Sets the pending two-factor enrollment lifetime.
    pub fn pending_setup_ttl(mut self, ttl: Duration) -> Self {
        self.pending_setup_ttl = ttl;
        self
    }

    /// Sets the password-reset PIN lifetime.
    pub fn reset_pin_ttl(mut self, ttl: Duration) -> Self {
        self.reset_pin_ttl = ttl;
        self
    }

    /// Sets the email-verification token lifetime.
    pub fn email_token_ttl(mut self, ttl: Duration) -> Self {
        self.email_token_ttl = ttl;
        self
    }
}
