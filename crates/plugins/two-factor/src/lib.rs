//! # Campus Auth Two-Factor Plugin
//!
//! Two-factor authentication primitives for Campus Auth: TOTP secret
//! generation and validation (RFC 6238), one-time recovery codes, and
//! remembered-device tokens that let a previously verified browser skip
//! the second-factor prompt until the trust expires or is revoked.
//!
//! The login orchestration that sequences these lives in the `campus-auth`
//! facade crate.

mod backup;
mod config;
mod device;
mod totp;

pub use backup::RecoveryCodeManager;
pub use config::{RecoveryCodeOptions, TotpOptions, TwoFactorConfig};
pub use device::RememberedDeviceManager;
pub use totp::{ProvisioningPayload, TotpManager};
