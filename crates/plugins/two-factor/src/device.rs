//! Remembered-device tokens.
//!
//! A browser that completed a full two-factor login can be granted a bypass
//! token. The raw token goes to the client once; the store keeps only its
//! SHA-256 hash. Trust lapses by expiry, by explicit revocation, or by the
//! revoke-all cascades that run on password change and two-factor disable.

use chrono::Duration;
use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use campus_auth_core::{AuthResult, Clock, CredentialStore, RememberedDevice};

/// Raw token length in characters.
const TOKEN_LEN: usize = 48;

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Issues and checks remembered-device tokens against the credential store.
pub struct RememberedDeviceManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl RememberedDeviceManager {
    /// Creates a manager granting trust for `trust_days` days.
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, trust_days: u32) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::days(i64::from(trust_days)),
        }
    }

    /// Records a new trusted device and returns the raw token for the
    /// client cookie. The cleartext is not retained anywhere else.
    pub async fn remember(
        &self,
        user_id: &str,
        device_name: Option<String>,
        user_agent: Option<String>,
    ) -> AuthResult<String> {
        let now = self.clock.now();
        let raw: String = (0..TOKEN_LEN)
            .map(|_| {
                let idx = OsRng.gen_range(0..TOKEN_CHARSET.len());
                TOKEN_CHARSET[idx] as char
            })
            .collect();

        let mut device = RememberedDevice::new(user_id, hash_token(&raw), now + self.ttl, now);
        device.device_name = device_name;
        device.user_agent = user_agent;

        self.store.insert_device(&device).await?;
        debug!(user_id = %user_id, device_id = %device.id, "remembered device");
        Ok(raw)
    }

    /// Checks whether a presented raw token grants a two-factor bypass.
    ///
    /// A matching row that has expired is deleted on the spot; revoked rows
    /// stay for the device listing but never validate.
    pub async fn is_valid(&self, user_id: &str, raw_token: &str) -> AuthResult<bool> {
        let now = self.clock.now();
        let wanted = hash_token(raw_token);

        for device in self.store.devices_for_user(user_id).await? {
            if device.token_hash != wanted {
                continue;
            }
            if device.revoked {
                return Ok(false);
            }
            if device.is_expired(now) {
                self.store.delete_device(&device.id).await?;
                return Ok(false);
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Lists all remembered devices for an identity.
    pub async fn list(&self, user_id: &str) -> AuthResult<Vec<RememberedDevice>> {
        self.store.devices_for_user(user_id).await
    }

    /// Revokes a single device by id. Returns false when the id does not
    /// belong to the identity.
    pub async fn revoke(&self, user_id: &str, device_id: &str) -> AuthResult<bool> {
        let devices = self.store.devices_for_user(user_id).await?;
        let Some(mut device) = devices.into_iter().find(|d| d.id == device_id) else {
            return Ok(false);
        };
        if !device.revoked {
            device.revoked = true;
            self.store.update_device(&device).await?;
            debug!(user_id = %user_id, device_id = %device_id, "revoked device");
        }
        Ok(true)
    }

    /// Revokes every device of an identity. Returns how many rows changed.
    pub async fn revoke_all(&self, user_id: &str) -> AuthResult<usize> {
        let revoked = self.store.revoke_devices_for_user(user_id).await?;
        if revoked > 0 {
            debug!(user_id = %user_id, count = revoked, "revoked all devices");
        }
        Ok(revoked)
    }
}

fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_auth_adapter_memory::MemoryCredentialStore;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    struct TestClock(Mutex<DateTime<Utc>>);

    impl TestClock {
        fn at(start: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(start)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn setup() -> (Arc<MemoryCredentialStore>, Arc<TestClock>, RememberedDeviceManager) {
        let store = Arc::new(MemoryCredentialStore::new());
        let clock = TestClock::at(Utc::now());
        let manager = RememberedDeviceManager::new(store.clone(), clock.clone(), 30);
        (store, clock, manager)
    }

    #[tokio::test]
    async fn test_remember_and_validate() {
        let (_, _, manager) = setup();
        let token = manager.remember("u1", None, None).await.unwrap();

        assert_eq!(token.len(), TOKEN_LEN);
        assert!(manager.is_valid("u1", &token).await.unwrap());
        assert!(!manager.is_valid("u1", "bogus").await.unwrap());
        // A token never validates for a different identity.
        assert!(!manager.is_valid("u2", &token).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_is_deleted_lazily() {
        let (store, clock, manager) = setup();
        let token = manager.remember("u1", None, None).await.unwrap();

        clock.advance(Duration::days(31));
        assert!(!manager.is_valid("u1", &token).await.unwrap());
        assert_eq!(store.device_count().await, 0);
    }

    #[tokio::test]
    async fn test_revoked_token_stays_listed_but_invalid() {
        let (_, _, manager) = setup();
        let token = manager
            .remember("u1", Some("Chrome on Windows".to_string()), None)
            .await
            .unwrap();

        let devices = manager.list("u1").await.unwrap();
        assert_eq!(devices.len(), 1);
        assert!(manager.revoke("u1", &devices[0].id).await.unwrap());

        assert!(!manager.is_valid("u1", &token).await.unwrap());
        let devices = manager.list("u1").await.unwrap();
        assert_eq!(devices.len(), 1);
        assert!(devices[0].revoked);
    }

    #[tokio::test]
    async fn test_revoke_rejects_foreign_device_id() {
        let (_, _, manager) = setup();
        manager.remember("u1", None, None).await.unwrap();
        let devices = manager.list("u1").await.unwrap();

        assert!(!manager.revoke("u2", &devices[0].id).await.unwrap());
        assert!(!manager.revoke("u1", "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let (_, _, manager) = setup();
        let t1 = manager.remember("u1", None, None).await.unwrap();
        let t2 = manager.remember("u1", None, None).await.unwrap();
        manager.remember("u2", None, None).await.unwrap();

        assert_eq!(manager.revoke_all("u1").await.unwrap(), 2);
        assert!(!manager.is_valid("u1", &t1).await.unwrap());
        assert!(!manager.is_valid("u1", &t2).await.unwrap());
        // Unrelated identity untouched.
        assert_eq!(manager.list("u2").await.unwrap().len(), 1);
    }
}
