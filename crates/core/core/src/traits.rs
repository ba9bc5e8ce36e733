//! Collaborator traits for Campus Auth.
//!
//! The core does not dictate storage technology or delivery mechanics; it
//! consumes a credential store, a notification sender and a clock through
//! the traits defined here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::AuthResult;
use crate::types::{Identity, RememberedDevice};

/// Persistence contract for identities and their remembered devices.
///
/// Counter mutations (`record_failed_attempt`) must be applied as atomic
/// read-modify-write so that concurrent login attempts against the same
/// identity cannot under-count failures.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // ==================== Identity Operations ====================

    /// Looks up an identity by email or username, case-insensitively.
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<Identity>>;

    /// Gets an identity by its stable id.
    async fn get_identity(&self, id: &str) -> AuthResult<Option<Identity>>;

    /// Persists the current state of an identity.
    async fn update_identity(&self, identity: &Identity) -> AuthResult<()>;

    /// Atomically increments the failed-attempt counter and returns the new
    /// count.
    async fn record_failed_attempt(&self, user_id: &str) -> AuthResult<u32>;

    /// Sets or clears the lockout expiry.
    async fn set_lockout(&self, user_id: &str, until: Option<DateTime<Utc>>) -> AuthResult<()>;

    /// Resets the failed-attempt counter to zero.
    async fn clear_failed_attempts(&self, user_id: &str) -> AuthResult<()>;

    // ==================== Device Operations ====================

    /// Inserts a remembered-device record.
    async fn insert_device(&self, device: &RememberedDevice) -> AuthResult<()>;

    /// Lists all remembered devices for an identity, including revoked and
    /// expired rows still awaiting cleanup.
    async fn devices_for_user(&self, user_id: &str) -> AuthResult<Vec<RememberedDevice>>;

    /// Persists the current state of a device record.
    async fn update_device(&self, device: &RememberedDevice) -> AuthResult<()>;

    /// Deletes a device record outright.
    async fn delete_device(&self, device_id: &str) -> AuthResult<()>;

    /// Marks every device of an identity revoked. Returns how many rows
    /// changed.
    async fn revoke_devices_for_user(&self, user_id: &str) -> AuthResult<usize>;
}

/// Outbound notification collaborator (email delivery is out of scope; the
/// core only hands over a template key and its fields).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends a templated notification to the given address.
    async fn send_templated(
        &self,
        to: &str,
        subject: &str,
        template_key: &str,
        fields: HashMap<String, String>,
    ) -> AuthResult<()>;
}

/// Wall-clock source, injected so expiry logic is testable.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
