//! Login orchestration.
//!
//! [`AuthService`] sequences the verification stages: lockout gate, password
//! check, optional second factor (TOTP, recovery code, or remembered-device
//! bypass), and session issuance. It also drives the account-maintenance
//! flows: password reset and change, two-factor enrollment and disable,
//! device management, and email verification.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use campus_auth_core::{
    AuthError, AuthResult, Clock, CredentialStore, Gate, Identity, LockoutTracker,
    NotificationSender, RememberedDevice, SessionTicket, SystemClock, TotpEnrollment,
};
use campus_auth_plugin_email_token::{EmailVerifier, EmailVerifyOutcome, ResetPinManager};
use campus_auth_plugin_password::PasswordHasher;
use campus_auth_plugin_two_factor::{
    ProvisioningPayload, RecoveryCodeManager, RememberedDeviceManager, TotpManager,
};

use crate::config::AuthConfig;

/// Outcome of the first login stage.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Fully authenticated; no second factor required (or it was bypassed by
    /// a valid remembered-device token).
    Authenticated(SessionTicket),
    /// Password accepted; a second factor is required. Present `challenge`
    /// back with the code.
    NeedsSecondFactor { challenge: String },
    /// The account is locked until the given instant.
    Locked { until: DateTime<Utc> },
    /// Unknown account, wrong password, or the account may not sign in.
    /// Deliberately indistinguishable.
    Rejected,
}

/// Outcome of the second login stage.
#[derive(Debug, Clone)]
pub enum SecondFactorOutcome {
    /// Fully authenticated. `device_token` is set when device trust was
    /// requested and granted; it goes into the client cookie.
    Authenticated {
        session: SessionTicket,
        device_token: Option<String>,
    },
    /// The account is locked until the given instant.
    Locked { until: DateTime<Utc> },
    /// Wrong code, spent recovery code, or an unknown or expired challenge.
    Rejected,
}

/// Outcome of completing a password reset.
#[derive(Debug, Clone)]
pub enum ResetOutcome {
    /// The PIN matched and the password was replaced.
    Success,
    /// The PIN did not match, has expired, or the account is unknown.
    InvalidOrExpired,
    /// The account is locked until the given instant.
    Locked { until: DateTime<Utc> },
}

/// Client hints stored alongside a remembered-device grant.
#[derive(Debug, Clone, Default)]
pub struct RememberDevice {
    /// Label such as "Chrome on Windows".
    pub device_name: Option<String>,
    /// Raw user-agent string.
    pub user_agent: Option<String>,
}

/// A password-verified login waiting for its second factor.
#[derive(Debug, Clone)]
struct PendingLogin {
    user_id: String,
    remember_me: bool,
    expires_at: DateTime<Utc>,
}

/// A generated TOTP secret waiting for its confirmation code.
#[derive(Debug, Clone)]
struct PendingSetup {
    secret: String,
    expires_at: DateTime<Utc>,
}

/// The authentication service.
///
/// Cheap to share behind an `Arc`; all mutable state is interior.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    hasher: PasswordHasher,
    lockout: LockoutTracker,
    totp: TotpManager,
    recovery: RecoveryCodeManager,
    devices: RememberedDeviceManager,
    reset_pins: ResetPinManager,
    email_verifier: EmailVerifier,
    /// Challenge id -> password-verified login awaiting a second factor.
    pending_logins: RwLock<HashMap<String, PendingLogin>>,
    /// User id -> unconfirmed TOTP secret.
    pending_setups: RwLock<HashMap<String, PendingSetup>>,
}

impl AuthService {
    /// Creates a service running on the system clock.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        sender: Arc<dyn NotificationSender>,
        config: AuthConfig,
    ) -> Self {
        Self::with_clock(store, sender, config, Arc::new(SystemClock))
    }

    /// Creates a service with an injected clock.
    pub fn with_clock(
        store: Arc<dyn CredentialStore>,
        sender: Arc<dyn NotificationSender>,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lockout = LockoutTracker::new(config.lockout.clone(), store.clone(), clock.clone());
        let totp = TotpManager::new(config.two_factor.issuer.clone(), &config.two_factor.totp);
        let recovery = RecoveryCodeManager::new(
            config.two_factor.recovery.amount,
            config.two_factor.recovery.length,
        );
        let devices = RememberedDeviceManager::new(
            store.clone(),
            clock.clone(),
            config.two_factor.remember_device_days,
        );
        let reset_pins = ResetPinManager::new(config.reset_pin_ttl);
        let email_verifier = EmailVerifier::new(config.email_token_ttl);
        let hasher = PasswordHasher::new(config.bcrypt_cost);

        Self {
            store,
            sender,
            clock,
            config,
            hasher,
            lockout,
            totp,
            recovery,
            devices,
            reset_pins,
            email_verifier,
            pending_logins: RwLock::new(HashMap::new()),
            pending_setups: RwLock::new(HashMap::new()),
        }
    }

    // ==================== Login ====================

    /// First login stage: identifier + password, with an optional
    /// remembered-device token for the two-factor bypass.
    ///
    /// Unknown accounts, wrong passwords and non-active accounts all come
    /// back as [`LoginOutcome::Rejected`] so the response does not reveal
    /// which accounts exist.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
        device_token: Option<&str>,
    ) -> AuthResult<LoginOutcome> {
        let Some(identity) = self.store.find_by_identifier(identifier).await? else {
            debug!("login attempt for unknown identifier");
            return Ok(LoginOutcome::Rejected);
        };

        if !identity.is_active() {
            info!(user_id = %identity.id, "login attempt on non-active account");
            return Ok(LoginOutcome::Rejected);
        }

        if let Gate::Denied { until } = self.lockout.gate(&identity) {
            return Ok(LoginOutcome::Locked { until });
        }

        if !self.hasher.verify(password, &identity.password_hash) {
            return Ok(match self.lockout.record_failure(&identity.id).await? {
                Gate::Denied { until } => LoginOutcome::Locked { until },
                Gate::Allowed => LoginOutcome::Rejected,
            });
        }

        if identity.two_factor_enabled() {
            if let Some(token) = device_token {
                if self.devices.is_valid(&identity.id, token).await? {
                    debug!(user_id = %identity.id, "second factor bypassed by remembered device");
                    let session = self.finish_login(&identity, remember_me).await?;
                    return Ok(LoginOutcome::Authenticated(session));
                }
            }

            let challenge = uuid::Uuid::new_v4().to_string();
            let now = self.clock.now();
            let mut logins = self.pending_logins.write().await;
            // Abandoned prompts would otherwise pile up in the map.
            logins.retain(|_, pending| pending.expires_at > now);
            logins.insert(
                challenge.clone(),
                PendingLogin {
                    user_id: identity.id.clone(),
                    remember_me,
                    expires_at: now + self.config.pending_login_ttl,
                },
            );
            return Ok(LoginOutcome::NeedsSecondFactor { challenge });
        }

        let session = self.finish_login(&identity, remember_me).await?;
        Ok(LoginOutcome::Authenticated(session))
    }

    /// Second login stage: answer a pending challenge with a TOTP code or a
    /// recovery code.
    ///
    /// A wrong code leaves the challenge in place for retry (each failure
    /// still counts toward lockout); an expired or unknown challenge is
    /// rejected outright.
    pub async fn submit_second_factor(
        &self,
        challenge: &str,
        code: &str,
        use_recovery: bool,
        remember: Option<RememberDevice>,
    ) -> AuthResult<SecondFactorOutcome> {
        let now = self.clock.now();

        let pending = {
            let logins = self.pending_logins.read().await;
            logins.get(challenge).cloned()
        };
        let Some(pending) = pending else {
            return Ok(SecondFactorOutcome::Rejected);
        };
        if now >= pending.expires_at {
            self.pending_logins.write().await.remove(challenge);
            return Ok(SecondFactorOutcome::Rejected);
        }

        let Some(mut identity) = self.store.get_identity(&pending.user_id).await? else {
            self.pending_logins.write().await.remove(challenge);
            return Ok(SecondFactorOutcome::Rejected);
        };

        if let Gate::Denied { until } = self.lockout.gate(&identity) {
            return Ok(SecondFactorOutcome::Locked { until });
        }
        if !identity.is_active() {
            self.pending_logins.write().await.remove(challenge);
            return Ok(SecondFactorOutcome::Rejected);
        }

        // Two-factor may have been disabled while the challenge was
        // pending; the challenge is void but nothing was guessed wrong.
        let Some(enrollment) = identity.two_factor.as_mut() else {
            self.pending_logins.write().await.remove(challenge);
            return Ok(SecondFactorOutcome::Rejected);
        };

        let verified = if use_recovery {
            let consumed = self.recovery.consume(&mut enrollment.recovery_codes, code);
            if consumed {
                identity.touch();
                self.store.update_identity(&identity).await?;
                info!(user_id = %identity.id, "recovery code consumed");
            }
            consumed
        } else {
            self.totp.validate_at(&enrollment.secret, code, now)
        };

        if !verified {
            return Ok(match self.lockout.record_failure(&identity.id).await? {
                Gate::Denied { until } => SecondFactorOutcome::Locked { until },
                Gate::Allowed => SecondFactorOutcome::Rejected,
            });
        }

        self.pending_logins.write().await.remove(challenge);

        let device_token = match remember {
            Some(info) => Some(
                self.devices
                    .remember(&identity.id, info.device_name, info.user_agent)
                    .await?,
            ),
            None => None,
        };

        let session = self.finish_login(&identity, pending.remember_me).await?;
        Ok(SecondFactorOutcome::Authenticated {
            session,
            device_token,
        })
    }

    /// Clears the failure counter and issues a fresh session ticket.
    async fn finish_login(&self, identity: &Identity, persistent: bool) -> AuthResult<SessionTicket> {
        self.lockout.record_success(&identity.id).await?;
        let now = self.clock.now();
        let lifetime = if persistent {
            self.config.persistent_session_lifetime
        } else {
            self.config.session_lifetime
        };
        let session = SessionTicket::for_identity(identity, persistent, now, lifetime);
        info!(user_id = %identity.id, session_id = %session.id, "login successful");
        Ok(session)
    }

    /// Issues a fresh ticket for a still-valid session, picking up any
    /// profile changes. Claims are never patched in place.
    pub async fn reissue_session(&self, ticket: &SessionTicket) -> AuthResult<SessionTicket> {
        let now = self.clock.now();
        if ticket.is_expired(now) {
            return Err(AuthError::SessionExpired);
        }
        let identity = self
            .store
            .get_identity(&ticket.user_id)
            .await?
            .filter(Identity::is_active)
            .ok_or(AuthError::SessionExpired)?;

        let lifetime = if ticket.persistent {
            self.config.persistent_session_lifetime
        } else {
            self.config.session_lifetime
        };
        Ok(SessionTicket::for_identity(
            &identity,
            ticket.persistent,
            now,
            lifetime,
        ))
    }

    // ==================== Password reset ====================

    /// Starts a password reset. Always succeeds from the caller's point of
    /// view; the PIN email goes out only when the identifier matches an
    /// active account.
    pub async fn request_password_reset(&self, identifier: &str) -> AuthResult<()> {
        let Some(mut identity) = self.store.find_by_identifier(identifier).await? else {
            debug!("password reset requested for unknown identifier");
            return Ok(());
        };
        if !identity.is_active() {
            return Ok(());
        }

        let now = self.clock.now();
        let pin = self.reset_pins.issue(&mut identity, now);
        self.store.update_identity(&identity).await?;

        let mut fields = HashMap::new();
        fields.insert("pin".to_string(), pin);
        fields.insert(
            "expires_minutes".to_string(),
            self.reset_pins.ttl().num_minutes().to_string(),
        );
        self.sender
            .send_templated(
                &identity.email,
                "Your password reset code",
                "password-reset",
                fields,
            )
            .await?;
        info!(user_id = %identity.id, "password reset PIN issued");
        Ok(())
    }

    /// Completes a password reset with the emailed PIN.
    ///
    /// The new password is checked against the policy before the PIN is
    /// consumed, so a weak choice does not burn the PIN. Success replaces
    /// the hash, clears any lockout, and revokes all remembered devices.
    pub async fn reset_password(
        &self,
        identifier: &str,
        pin: &str,
        new_password: &str,
    ) -> AuthResult<ResetOutcome> {
        let Some(mut identity) = self.store.find_by_identifier(identifier).await? else {
            return Ok(ResetOutcome::InvalidOrExpired);
        };

        if let Gate::Denied { until } = self.lockout.gate(&identity) {
            return Ok(ResetOutcome::Locked { until });
        }

        self.config.password_policy.validate(new_password)?;

        let now = self.clock.now();
        if !self.reset_pins.validate(&mut identity, pin, now) {
            // Expiry may have cleared the stored PIN.
            self.store.update_identity(&identity).await?;
            return Ok(ResetOutcome::InvalidOrExpired);
        }

        identity.password_hash = self.hasher.hash(new_password)?;
        identity.touch();
        self.store.update_identity(&identity).await?;
        self.lockout.record_success(&identity.id).await?;
        let revoked = self.devices.revoke_all(&identity.id).await?;

        self.notify_password_changed(&identity).await?;
        info!(user_id = %identity.id, revoked_devices = revoked, "password reset completed");
        Ok(ResetOutcome::Success)
    }

    /// Changes the password of a signed-in account.
    ///
    /// Requires the current password, rejects reuse, and revokes all
    /// remembered devices on success.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let mut identity = self.require_identity(user_id).await?;

        if !self.hasher.verify(current_password, &identity.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if new_password == current_password {
            return Err(AuthError::weak_password(
                "must differ from the current password",
            ));
        }
        self.config.password_policy.validate(new_password)?;

        identity.password_hash = self.hasher.hash(new_password)?;
        identity.touch();
        self.store.update_identity(&identity).await?;
        let revoked = self.devices.revoke_all(&identity.id).await?;

        self.notify_password_changed(&identity).await?;
        info!(user_id = %identity.id, revoked_devices = revoked, "password changed");
        Ok(())
    }

    async fn notify_password_changed(&self, identity: &Identity) -> AuthResult<()> {
        self.sender
            .send_templated(
                &identity.email,
                "Your password was changed",
                "password-changed",
                HashMap::new(),
            )
            .await
    }

    // ==================== Two-factor enrollment ====================

    /// Starts two-factor enrollment: generates a secret and returns the
    /// provisioning data for the authenticator app. The secret is inert
    /// until confirmed with a valid code.
    pub async fn setup_two_factor(&self, user_id: &str) -> AuthResult<ProvisioningPayload> {
        let identity = self.require_identity(user_id).await?;
        if identity.two_factor_enabled() {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let secret = self.totp.generate_secret();
        let payload = self.totp.provisioning(&identity.email, &secret);

        let now = self.clock.now();
        self.pending_setups.write().await.insert(
            identity.id.clone(),
            PendingSetup {
                secret,
                expires_at: now + self.config.pending_setup_ttl,
            },
        );
        Ok(payload)
    }

    /// Confirms enrollment with a code from the authenticator app. The
    /// pending secret is discarded whether or not the code matches; a
    /// failed confirmation starts over from [`setup_two_factor`].
    ///
    /// [`setup_two_factor`]: AuthService::setup_two_factor
    ///
    /// Returns the freshly generated recovery codes. This is the only time
    /// they exist in cleartext outside the store.
    pub async fn confirm_two_factor(&self, user_id: &str, code: &str) -> AuthResult<Vec<String>> {
        let mut identity = self.require_identity(user_id).await?;
        if identity.two_factor_enabled() {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let now = self.clock.now();
        let pending = self.pending_setups.write().await.remove(user_id);
        let Some(pending) = pending else {
            return Err(AuthError::InvalidOrExpiredToken);
        };
        if now >= pending.expires_at {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        if !self.totp.validate_at(&pending.secret, code, now) {
            return Err(AuthError::InvalidSecondFactor);
        }

        let codes = self.recovery.generate();
        identity.two_factor = Some(TotpEnrollment::new(pending.secret, codes.clone(), now));
        identity.touch();
        self.store.update_identity(&identity).await?;

        self.sender
            .send_templated(
                &identity.email,
                "Two-factor authentication enabled",
                "two-factor-enabled",
                HashMap::new(),
            )
            .await?;
        info!(user_id = %identity.id, "two-factor enabled");
        Ok(codes)
    }

    /// Disables two-factor authentication. Requires the account password
    /// and a current code (TOTP or recovery). Revokes every remembered
    /// device, since the trust they encode no longer means anything.
    pub async fn disable_two_factor(
        &self,
        user_id: &str,
        password: &str,
        code: &str,
    ) -> AuthResult<()> {
        let mut identity = self.require_identity(user_id).await?;
        let Some(mut enrollment) = identity.two_factor.clone() else {
            return Err(AuthError::TwoFactorNotEnabled);
        };

        if !self.hasher.verify(password, &identity.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.clock.now();
        let verified = self.totp.validate_at(&enrollment.secret, code, now)
            || self.recovery.consume(&mut enrollment.recovery_codes, code);
        if !verified {
            return Err(AuthError::InvalidSecondFactor);
        }

        identity.two_factor = None;
        identity.touch();
        self.store.update_identity(&identity).await?;
        let revoked = self.devices.revoke_all(&identity.id).await?;

        self.sender
            .send_templated(
                &identity.email,
                "Two-factor authentication disabled",
                "two-factor-disabled",
                HashMap::new(),
            )
            .await?;
        warn!(user_id = %identity.id, revoked_devices = revoked, "two-factor disabled");
        Ok(())
    }

    /// Replaces the recovery-code set. Requires the account password.
    /// Previously issued codes stop working immediately.
    pub async fn regenerate_recovery_codes(
        &self,
        user_id: &str,
        password: &str,
    ) -> AuthResult<Vec<String>> {
        let mut identity = self.require_identity(user_id).await?;
        if !self.hasher.verify(password, &identity.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        let Some(enrollment) = identity.two_factor.as_mut() else {
            return Err(AuthError::TwoFactorNotEnabled);
        };

        let codes = self.recovery.generate();
        enrollment.recovery_codes = codes.clone();
        identity.touch();
        self.store.update_identity(&identity).await?;
        info!(user_id = %identity.id, "recovery codes regenerated");
        Ok(codes)
    }

    // ==================== Remembered devices ====================

    /// Lists the remembered devices of an account, including revoked and
    /// expired entries still awaiting cleanup.
    pub async fn list_remembered_devices(&self, user_id: &str) -> AuthResult<Vec<RememberedDevice>> {
        self.devices.list(user_id).await
    }

    /// Revokes one remembered device. Returns false when the device id does
    /// not belong to the account.
    pub async fn revoke_device(&self, user_id: &str, device_id: &str) -> AuthResult<bool> {
        self.devices.revoke(user_id, device_id).await
    }

    /// Revokes every remembered device of an account. Returns how many
    /// changed.
    pub async fn revoke_all_devices(&self, user_id: &str) -> AuthResult<usize> {
        self.devices.revoke_all(user_id).await
    }

    // ==================== Email verification ====================

    /// Sends (or re-sends) an email-verification link token. A no-op when
    /// the address is already verified.
    pub async fn request_email_verification(&self, user_id: &str) -> AuthResult<()> {
        let mut identity = self.require_identity(user_id).await?;
        if identity.email_verified {
            return Ok(());
        }

        let now = self.clock.now();
        let token = self.email_verifier.issue(&mut identity, now);
        self.store.update_identity(&identity).await?;

        let mut fields = HashMap::new();
        fields.insert("token".to_string(), token);
        self.sender
            .send_templated(
                &identity.email,
                "Verify your email address",
                "verify-email",
                fields,
            )
            .await?;
        Ok(())
    }

    /// Completes email verification with the emailed token.
    pub async fn verify_email(
        &self,
        user_id: &str,
        token: &str,
    ) -> AuthResult<EmailVerifyOutcome> {
        let mut identity = self.require_identity(user_id).await?;
        let now = self.clock.now();
        let outcome = self.email_verifier.verify(&mut identity, token, now);
        self.store.update_identity(&identity).await?;
        if outcome == EmailVerifyOutcome::Verified {
            info!(user_id = %identity.id, "email verified");
        }
        Ok(outcome)
    }

    // ==================== Helpers ====================

    /// Loads an identity for an account-maintenance flow. Unknown or
    /// non-active accounts read as bad credentials.
    async fn require_identity(&self, user_id: &str) -> AuthResult<Identity> {
        self.store
            .get_identity(user_id)
            .await?
            .filter(Identity::is_active)
            .ok_or(AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_auth_adapter_memory::{MemoryCredentialStore, RecordingSender};
    use campus_auth_core::UserRole;
    use chrono::Duration;

    #[tokio::test]
    async fn expired_challenges_are_purged_when_a_new_one_is_stashed() {
        let store = Arc::new(MemoryCredentialStore::new());
        let sender = Arc::new(RecordingSender::new());
        let auth = AuthService::new(
            store.clone(),
            sender,
            AuthConfig::new().bcrypt_cost(4),
        );

        let now = auth.clock.now();
        auth.pending_logins.write().await.insert(
            "stale".to_string(),
            PendingLogin {
                user_id: "u0".to_string(),
                remember_me: false,
                expires_at: now - Duration::seconds(1),
            },
        );

        let hash = PasswordHasher::new(4).hash("hunter22").unwrap();
        let mut identity = Identity::new("jdoe", "jdoe@campus.test", hash, UserRole::Student);
        identity.two_factor = Some(TotpEnrollment::new("JBSWY3DPEHPK3PXP", vec![], now));
        store.add_identity(identity).await;

        let outcome = auth.login("jdoe", "hunter22", false, None).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::NeedsSecondFactor { .. }));

        // Stashing the new challenge swept the aged-out one.
        let logins = auth.pending_logins.read().await;
        assert_eq!(logins.len(), 1);
        assert!(!logins.contains_key("stale"));
    }
}
