//! Error types for Campus Auth.
//!
//! This module defines the `AuthError` enum which represents all possible
//! errors that can occur within the account-security core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The main error type for Campus Auth operations.
///
/// Credential-related failures are deliberately generic: a wrong password,
/// an unknown identifier, and an inactive account all surface as
/// `InvalidCredentials` so the caller cannot learn which check failed.
/// Operational failures (expired tokens, locked accounts) stay specific.
#[derive(Debug, Error)]
pub enum AuthError {
    // ==================== Authentication Errors ====================
    /// The identifier or password is wrong, or the account is not active.
    #[error("Invalid login attempt")]
    InvalidCredentials,

    /// The account is locked out until the given time.
    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    /// The submitted second factor (TOTP or recovery code) was not valid.
    #[error("Invalid verification code")]
    InvalidSecondFactor,

    /// The session ticket has aged out or its account can no longer sign in.
    #[error("Session expired")]
    SessionExpired,

    // ==================== Token Errors ====================
    /// A one-time token (reset PIN, email verification, remembered device)
    /// did not match or has expired.
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    // ==================== Two-Factor State Errors ====================
    /// The operation requires two-factor authentication to be enabled.
    #[error("Two-factor authentication is not enabled")]
    TwoFactorNotEnabled,

    /// Two-factor authentication is already enabled for this account.
    #[error("Two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,

    // ==================== Validation Errors ====================
    /// The password does not meet the configured policy.
    #[error("Password does not meet requirements: {reason}")]
    WeakPassword { reason: String },

    // ==================== Infrastructure Errors ====================
    /// The credential store could not be reached or failed mid-operation.
    /// Not retried by the core; the caller may retry the whole request.
    #[error("Credential store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// The notification collaborator failed to deliver.
    #[error("Notification delivery failed: {message}")]
    NotificationFailed { message: String },

    /// An internal invariant was violated.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    /// Creates a new store-unavailable error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new notification-delivery error.
    pub fn notification(message: impl Into<String>) -> Self {
        Self::NotificationFailed {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a new weak-password error.
    pub fn weak_password(reason: impl Into<String>) -> Self {
        Self::WeakPassword {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a user-facing error (vs internal/infra).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::AccountLocked { .. }
                | Self::InvalidSecondFactor
                | Self::SessionExpired
                | Self::InvalidOrExpiredToken
                | Self::TwoFactorNotEnabled
                | Self::TwoFactorAlreadyEnabled
                | Self::WeakPassword { .. }
        )
    }
}

/// A Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}
