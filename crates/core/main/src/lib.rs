//! # Campus Auth
//!
//! Authentication and session security for campus administration systems:
//! password login with progressive lockout, password reset by emailed PIN,
//! TOTP two-factor authentication with one-time recovery codes,
//! remembered-device trust, and email verification.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use campus_auth::prelude::*;
//! use campus_auth_adapter_memory::{MemoryCredentialStore, RecordingSender};
//!
//! # async fn run() -> AuthResult<()> {
//! let store = Arc::new(MemoryCredentialStore::new());
//! let sender = Arc::new(RecordingSender::new());
//! let auth = AuthService::new(store, sender, AuthConfig::default());
//!
//! match auth.login("jdoe@campus.test", "hunter22", false, None).await? {
//!     LoginOutcome::Authenticated(session) => println!("welcome {}", session.display_name),
//!     LoginOutcome::NeedsSecondFactor { challenge } => println!("2FA: {challenge}"),
//!     LoginOutcome::Locked { until } => println!("locked until {until}"),
//!     LoginOutcome::Rejected => println!("invalid login attempt"),
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod flow;

pub use config::AuthConfig;
pub use flow::{
    AuthService, LoginOutcome, RememberDevice, ResetOutcome, SecondFactorOutcome,
};

// Re-export the core and plugin surfaces so most applications only depend
// on this crate.
pub use campus_auth_core::{
    AuthError, AuthResult, Clock, CredentialStore, Gate, Identity, LockoutPolicy, LockoutTracker,
    NotificationSender, RememberedDevice, ResetPin, SessionTicket, SystemClock, TotpEnrollment,
    UserRole, UserStatus, VerificationToken,
};
pub use campus_auth_plugin_email_token::{EmailVerifier, EmailVerifyOutcome, ResetPinManager};
pub use campus_auth_plugin_password::{PasswordHasher, PasswordPolicy};
pub use campus_auth_plugin_two_factor::{
    ProvisioningPayload, RecoveryCodeManager, RecoveryCodeOptions, RememberedDeviceManager,
    TotpManager, TotpOptions, TwoFactorConfig,
};

/// Common imports for applications built on Campus Auth.
pub mod prelude {
    pub use crate::config::AuthConfig;
    pub use crate::flow::{
        AuthService, LoginOutcome, RememberDevice, ResetOutcome, SecondFactorOutcome,
    };
    pub use campus_auth_core::{
        AuthError, AuthResult, CredentialStore, Identity, NotificationSender, SessionTicket,
        UserRole, UserStatus,
    };
}
