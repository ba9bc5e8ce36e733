//! Core data types for Campus Auth.
//!
//! This module defines the `Identity` aggregate that owns every per-account
//! security field, the `RememberedDevice` collection it controls, and the
//! `SessionTicket` assertion issued on successful authentication.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to an account, used only to decide sign-in outcome routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Administrator,
    Lecturer,
    Student,
}

/// Account lifecycle status. Only `Active` accounts may authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

/// An active password-reset PIN attached to an identity.
///
/// At most one is active per identity. The PIN itself is never stored;
/// only its hash, together with the expiry timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPin {
    /// SHA-256 hex digest of the 6-digit PIN.
    pub pin_hash: String,
    /// When the PIN stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl ResetPin {
    /// Checks if the PIN has expired at the given instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An active email-verification token attached to an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationToken {
    /// SHA-256 hex digest of the raw token.
    pub token_hash: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl VerificationToken {
    /// Checks if the token has expired at the given instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A confirmed TOTP enrollment.
///
/// Presence of this value means two-factor authentication is enabled:
/// there is no separate enabled flag to drift out of sync with the secret.
/// Disabling drops the whole value, clearing the secret and the remaining
/// recovery codes in one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpEnrollment {
    /// Base32-encoded shared secret. Never empty.
    pub secret: String,
    /// Unconsumed one-time recovery codes, unique within the set.
    pub recovery_codes: Vec<String>,
    /// When the enrollment was confirmed.
    pub enrolled_at: DateTime<Utc>,
}

impl TotpEnrollment {
    /// Creates a new enrollment.
    pub fn new(secret: impl Into<String>, recovery_codes: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            recovery_codes,
            enrolled_at: now,
        }
    }
}

/// A single account and the security state attached to it.
///
/// All per-account security fields live here and are exclusively owned by
/// this aggregate; remembered devices are owned too but stored as a
/// separate collection (one identity, many tokens).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Stable unique identifier (UUID).
    pub id: String,

    /// Login name, unique, compared case-insensitively.
    pub username: String,

    /// Email address, unique, compared case-insensitively.
    pub email: String,

    /// Whether the email address has been verified.
    #[serde(default)]
    pub email_verified: bool,

    /// Optional display name shown in the issued session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Role tag.
    pub role: UserRole,

    /// Lifecycle status.
    pub status: UserStatus,

    /// bcrypt hash of the account password.
    pub password_hash: String,

    /// Consecutive failed verification attempts since the last success.
    /// Shared across password, TOTP and recovery-code failures.
    #[serde(default)]
    pub failed_attempts: u32,

    /// While set and in the future, every verification path is denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockout_until: Option<DateTime<Utc>>,

    /// Active password-reset PIN, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_pin: Option<ResetPin>,

    /// TOTP enrollment. `Some` means two-factor is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_factor: Option<TotpEnrollment>,

    /// Active email-verification token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verification: Option<VerificationToken>,

    /// Timestamp when the identity was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp when the identity was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Creates a new active identity with the given credentials.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            email_verified: false,
            display_name: None,
            role,
            status: UserStatus::Active,
            password_hash: password_hash.into(),
            failed_attempts: 0,
            lockout_until: None,
            reset_pin: None,
            two_factor: None,
            email_verification: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Returns true if the account may attempt to authenticate.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Returns true if two-factor authentication is enabled.
    pub fn two_factor_enabled(&self) -> bool {
        self.two_factor.is_some()
    }

    /// Case-insensitive match against email or username.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let wanted = identifier.trim().to_lowercase();
        self.email.to_lowercase() == wanted || self.username.to_lowercase() == wanted
    }

    /// The name presented in issued sessions.
    pub fn presentable_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// Marks the identity as updated now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A browser or device granted a two-factor bypass.
///
/// The raw token exists only transiently: in the outbound cookie and at the
/// moment of hashing. The store holds its hash, never the cleartext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RememberedDevice {
    /// Unique identifier.
    pub id: String,
    /// The owning identity.
    pub user_id: String,
    /// SHA-256 hex digest of the raw token.
    pub token_hash: String,
    /// When the bypass stops applying.
    pub expires_at: DateTime<Utc>,
    /// Set when the device was revoked (explicitly or via a cascade).
    #[serde(default)]
    pub revoked: bool,
    /// Optional label such as "Chrome on Windows".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Optional raw user-agent string for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Timestamp when the device was remembered.
    pub created_at: DateTime<Utc>,
}

impl RememberedDevice {
    /// Creates a new remembered device record.
    pub fn new(
        user_id: impl Into<String>,
        token_hash: impl Into<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            token_hash: token_hash.into(),
            expires_at,
            revoked: false,
            device_name: None,
            user_agent: None,
            created_at: now,
        }
    }

    /// Checks if the device trust has expired at the given instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// A device is usable iff it is not revoked and not expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }
}

/// The identity assertion issued on successful authentication.
///
/// A ticket is a pure projection of current `Identity` state; on profile
/// mutation a fresh ticket is issued rather than patching claims in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTicket {
    /// Unique session identifier.
    pub id: String,
    /// Stable identifier of the authenticated identity.
    pub user_id: String,
    /// Display name at issuance time.
    pub display_name: String,
    /// Role at issuance time.
    pub role: UserRole,
    /// Mirrors the "remember me" choice (distinct from device-remember).
    pub persistent: bool,
    /// When the session was issued.
    pub issued_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

impl SessionTicket {
    /// Projects a fresh ticket from the current identity state.
    pub fn for_identity(
        identity: &Identity,
        persistent: bool,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: identity.id.clone(),
            display_name: identity.presentable_name().to_string(),
            role: identity.role,
            persistent,
            issued_at: now,
            expires_at: now + lifetime,
        }
    }

    /// Checks if the session has expired at the given instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
