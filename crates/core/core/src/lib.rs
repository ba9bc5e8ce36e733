//! # Campus Auth Core
//!
//! Core types and traits for the Campus Auth account-security library.
//!
//! This crate defines the `Identity` aggregate and its security fields, the
//! error taxonomy, the lockout state machine, and the collaborator traits
//! (`CredentialStore`, `NotificationSender`, `Clock`) that the surrounding
//! application implements. The flow orchestration lives in the `campus-auth`
//! facade crate; the verification primitives live in the plugin crates.

pub mod error;
pub mod lockout;
pub mod traits;
pub mod types;

pub use error::{AuthError, AuthResult};
pub use lockout::{Gate, LockoutPolicy, LockoutTracker};
pub use traits::{Clock, CredentialStore, NotificationSender, SystemClock};
pub use types::{
    Identity, RememberedDevice, ResetPin, SessionTicket, TotpEnrollment, UserRole, UserStatus,
    VerificationToken,
};
