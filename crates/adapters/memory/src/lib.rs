//! # Campus Auth Memory Adapter
//!
//! An in-memory credential store for Campus Auth, primarily intended for
//! testing and development purposes. Data is lost when the process exits.
//!
//! Also provides [`RecordingSender`], a notification stub that captures
//! outbound messages so tests can assert on delivered PINs and alerts.

use async_trait::async_trait;
use campus_auth_core::error::{AuthError, AuthResult};
use campus_auth_core::traits::{CredentialStore, NotificationSender};
use campus_auth_core::types::{Identity, RememberedDevice};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for a single entity type.
type Store<T> = Arc<RwLock<HashMap<String, T>>>;

/// In-memory credential store.
///
/// Counter mutations run under the write lock, which gives the atomic
/// read-modify-write the `CredentialStore` contract requires.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    identities: Store<Identity>,
    devices: Store<RememberedDevice>,
}

impl MemoryCredentialStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an identity, replacing any record with the same id.
    pub async fn add_identity(&self, identity: Identity) {
        self.identities
            .write()
            .await
            .insert(identity.id.clone(), identity);
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        self.identities.write().await.clear();
        self.devices.write().await.clear();
    }

    /// Returns the number of identities stored.
    pub async fn identity_count(&self) -> usize {
        self.identities.read().await.len()
    }

    /// Returns the number of device rows stored (including revoked ones).
    pub async fn device_count(&self) -> usize {
        self.devices.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    // ==================== Identity Operations ====================

    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities
            .values()
            .find(|i| i.matches_identifier(identifier))
            .cloned())
    }

    async fn get_identity(&self, id: &str) -> AuthResult<Option<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities.get(id).cloned())
    }

    async fn update_identity(&self, identity: &Identity) -> AuthResult<()> {
        let mut identities = self.identities.write().await;
        if !identities.contains_key(&identity.id) {
            return Err(AuthError::internal(format!(
                "identity {} not found",
                identity.id
            )));
        }
        identities.insert(identity.id.clone(), identity.clone());
        Ok(())
    }

    async fn record_failed_attempt(&self, user_id: &str) -> AuthResult<u32> {
        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(user_id)
            .ok_or_else(|| AuthError::internal(format!("identity {user_id} not found")))?;
        identity.failed_attempts += 1;
        identity.touch();
        Ok(identity.failed_attempts)
    }

    async fn set_lockout(&self, user_id: &str, until: Option<DateTime<Utc>>) -> AuthResult<()> {
        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(user_id)
            .ok_or_else(|| AuthError::internal(format!("identity {user_id} not found")))?;
        identity.lockout_until = until;
        identity.touch();
        Ok(())
    }

    async fn clear_failed_attempts(&self, user_id: &str) -> AuthResult<()> {
        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(user_id)
            .ok_or_else(|| AuthError::internal(format!("identity {user_id} not found")))?;
        identity.failed_attempts = 0;
        identity.touch();
        Ok(())
    }

    // ==================== Device Operations ====================

    async fn insert_device(&self, device: &RememberedDevice) -> AuthResult<()> {
        let mut devices = self.devices.write().await;
        devices.insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn devices_for_user(&self, user_id: &str) -> AuthResult<Vec<RememberedDevice>> {
        let devices = self.devices.read().await;
        let mut owned: Vec<RememberedDevice> = devices
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|d| d.created_at);
        Ok(owned)
    }

    async fn update_device(&self, device: &RememberedDevice) -> AuthResult<()> {
        let mut devices = self.devices.write().await;
        if !devices.contains_key(&device.id) {
            return Err(AuthError::internal(format!(
                "device {} not found",
                device.id
            )));
        }
        devices.insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn delete_device(&self, device_id: &str) -> AuthResult<()> {
        let mut devices = self.devices.write().await;
        devices.remove(device_id);
        Ok(())
    }

    async fn revoke_devices_for_user(&self, user_id: &str) -> AuthResult<usize> {
        let mut devices = self.devices.write().await;
        let mut changed = 0;
        for device in devices.values_mut() {
            if device.user_id == user_id && !device.revoked {
                device.revoked = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// A captured outbound notification.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub to: String,
    pub subject: String,
    pub template_key: String,
    pub fields: HashMap<String, String>,
}

/// Notification stub that records everything it is asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingSender {
    sent: Arc<RwLock<Vec<SentNotification>>>,
}

impl RecordingSender {
    /// Creates a new recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    /// The most recent notification, if any.
    pub async fn last(&self) -> Option<SentNotification> {
        self.sent.read().await.last().cloned()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send_templated(
        &self,
        to: &str,
        subject: &str,
        template_key: &str,
        fields: HashMap<String, String>,
    ) -> AuthResult<()> {
        self.sent.write().await.push(SentNotification {
            to: to.to_string(),
            subject: subject.to_string(),
            template_key: template_key.to_string(),
            fields,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_auth_core::types::UserRole;

    fn identity(username: &str, email: &str) -> Identity {
        Identity::new(username, email, "$2b$12$hash", UserRole::Student)
    }

    #[tokio::test]
    async fn test_find_by_identifier_matches_email_and_username() {
        let store = MemoryCredentialStore::new();
        store.add_identity(identity("jdoe", "jdoe@campus.test")).await;

        let by_name = store.find_by_identifier("JDOE").await.unwrap();
        assert!(by_name.is_some());

        let by_email = store.find_by_identifier("jdoe@CAMPUS.test").await.unwrap();
        assert!(by_email.is_some());

        let missing = store.find_by_identifier("nobody").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_failed_attempt_counter_increments() {
        let store = MemoryCredentialStore::new();
        let id = identity("jdoe", "jdoe@campus.test");
        let user_id = id.id.clone();
        store.add_identity(id).await;

        assert_eq!(store.record_failed_attempt(&user_id).await.unwrap(), 1);
        assert_eq!(store.record_failed_attempt(&user_id).await.unwrap(), 2);

        store.clear_failed_attempts(&user_id).await.unwrap();
        let fresh = store.get_identity(&user_id).await.unwrap().unwrap();
        assert_eq!(fresh.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_revoke_devices_for_user_only_touches_owner() {
        let store = MemoryCredentialStore::new();
        let now = Utc::now();
        let mine = RememberedDevice::new("u1", "h1", now + chrono::Duration::days(30), now);
        let theirs = RememberedDevice::new("u2", "h2", now + chrono::Duration::days(30), now);
        store.insert_device(&mine).await.unwrap();
        store.insert_device(&theirs).await.unwrap();

        let changed = store.revoke_devices_for_user("u1").await.unwrap();
        assert_eq!(changed, 1);

        let theirs_after = store.devices_for_user("u2").await.unwrap();
        assert!(!theirs_after[0].revoked);
    }

    #[tokio::test]
    async fn test_recording_sender_captures_fields() {
        let sender = RecordingSender::new();
        let mut fields = HashMap::new();
        fields.insert("pin".to_string(), "042137".to_string());
        sender
            .send_templated("jdoe@campus.test", "Reset", "password-reset", fields)
            .await
            .unwrap();

        let last = sender.last().await.unwrap();
        assert_eq!(last.to, "jdoe@campus.test");
        assert_eq!(last.fields.get("pin").map(String::as_str), Some("042137"));
    }
}
