//! TOTP (Time-based One-Time Password) generation and validation.
//!
//! RFC 6238 over HMAC-SHA1 with RFC 4226 dynamic truncation. Secrets are
//! encoded with the RFC 4648 base32 alphabet (no padding) for compatibility
//! with standard authenticator apps.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha1::Sha1;

use crate::config::TotpOptions;

type HmacSha1 = Hmac<Sha1>;

/// Secret length in bytes (160 bits, the RFC 4226 recommendation).
const SECRET_LEN: usize = 20;

/// The data an authenticator app needs to enroll.
#[derive(Debug, Clone)]
pub struct ProvisioningPayload {
    /// The complete otpauth:// URI, suitable for QR encoding.
    pub uri: String,
    /// The secret grouped for manual entry.
    pub manual_key: String,
}

/// TOTP manager for generating secrets and verifying codes.
#[derive(Debug, Clone)]
pub struct TotpManager {
    issuer: String,
    digits: u32,
    period: u64,
    skew: u32,
}

impl TotpManager {
    /// Creates a new TOTP manager.
    pub fn new(issuer: impl Into<String>, options: &TotpOptions) -> Self {
        Self {
            issuer: issuer.into(),
            digits: options.digits,
            period: options.period,
            skew: options.skew,
        }
    }

    /// Generates a new shared secret from the OS random source.
    pub fn generate_secret(&self) -> String {
        let mut secret = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut secret);
        base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &secret)
    }

    /// Builds the provisioning data for the given account label and secret.
    /// Does not mutate any state.
    pub fn provisioning(&self, account: &str, secret: &str) -> ProvisioningPayload {
        let uri = format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
            percent_encode(&self.issuer),
            percent_encode(account),
            secret,
            percent_encode(&self.issuer),
            self.digits,
            self.period
        );

        let manual_key = secret
            .as_bytes()
            .chunks(4)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join(" ");

        ProvisioningPayload { uri, manual_key }
    }

    /// Verifies a code at the given instant, accepting the configured skew
    /// window on each side of the current step.
    pub fn validate_at(&self, secret: &str, code: &str, at: DateTime<Utc>) -> bool {
        let submitted = code.trim();
        if submitted.len() != self.digits as usize || !submitted.bytes().all(|b| b.is_ascii_digit())
        {
            return false;
        }

        let Some(secret_bytes) =
            base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret)
        else {
            return false;
        };

        let time = at.timestamp();
        if time < 0 {
            return false;
        }
        let counter = time as u64 / self.period;

        for offset in -(self.skew as i64)..=(self.skew as i64) {
            let step = counter as i64 + offset;
            if step < 0 {
                continue;
            }
            if let Some(expected) = self.hotp(&secret_bytes, step as u64) {
                if expected == submitted {
                    return true;
                }
            }
        }

        false
    }

    /// Computes the code for the step containing the given unix time.
    /// Exposed so callers can derive codes deterministically in tests and
    /// tooling.
    pub fn code_at(&self, secret: &str, unix_time: u64) -> Option<String> {
        let secret_bytes = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret)?;
        self.hotp(&secret_bytes, unix_time / self.period)
    }

    /// HOTP value for a counter (RFC 4226 dynamic truncation).
    fn hotp(&self, secret: &[u8], counter: u64) -> Option<String> {
        let mut mac = HmacSha1::new_from_slice(secret).ok()?;
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = u32::from_be_bytes([
            digest[offset] & 0x7f,
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);

        let code = binary % 10u32.pow(self.digits);
        Some(format!("{:0width$}", code, width = self.digits as usize))
    }
}

/// Minimal percent-encoding for otpauth URI components. Everything outside
/// the unreserved set is encoded byte-wise from its UTF-8 form.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // RFC 6238 appendix B secret: ASCII "12345678901234567890".
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn manager() -> TotpManager {
        TotpManager::new("Campus Auth", &TotpOptions::default())
    }

    #[test]
    fn test_secret_generation() {
        let manager = manager();
        let secret = manager.generate_secret();

        // Base32 encoded 20 bytes = 32 characters.
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, manager.generate_secret());
    }

    #[test]
    fn test_rfc6238_vectors() {
        let manager = manager();
        // Appendix B vectors, truncated to 6 digits.
        assert_eq!(manager.code_at(RFC_SECRET, 59).as_deref(), Some("287082"));
        assert_eq!(
            manager.code_at(RFC_SECRET, 1111111109).as_deref(),
            Some("081804")
        );
        assert_eq!(
            manager.code_at(RFC_SECRET, 1234567890).as_deref(),
            Some("005924")
        );
    }

    #[test]
    fn test_validate_round_trip_with_skew() {
        let manager = manager();
        let at = Utc.timestamp_opt(1111111109, 0).unwrap();
        let code = manager.code_at(RFC_SECRET, 1111111109).unwrap();

        assert!(manager.validate_at(RFC_SECRET, &code, at));
        // One step away: still inside the skew window.
        assert!(manager.validate_at(RFC_SECRET, &code, at + chrono::Duration::seconds(30)));
        // Two steps away: outside tolerance.
        assert!(!manager.validate_at(RFC_SECRET, &code, at + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_validate_rejects_malformed_codes() {
        let manager = manager();
        let at = Utc.timestamp_opt(59, 0).unwrap();
        assert!(!manager.validate_at(RFC_SECRET, "28708", at));
        assert!(!manager.validate_at(RFC_SECRET, "28708a", at));
        assert!(!manager.validate_at("not base32!!", "287082", at));
    }

    #[test]
    fn test_uri_generation() {
        let manager = TotpManager::new("Campus App", &TotpOptions::default());
        let payload = manager.provisioning("user@example.com", "JBSWY3DPEHPK3PXP");

        assert!(payload.uri.starts_with("otpauth://totp/"));
        assert!(payload.uri.contains("Campus%20App"));
        assert!(payload.uri.contains("user%40example.com"));
        assert!(payload.uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert_eq!(payload.manual_key, "JBSW Y3DP EHPK 3PXP");
    }

    #[test]
    fn test_uri_encodes_multibyte_labels() {
        let manager = TotpManager::new("Universität Wien", &TotpOptions::default());
        let payload = manager.provisioning("käthe@example.com", "JBSWY3DPEHPK3PXP");

        assert!(payload.uri.contains("Universit%C3%A4t%20Wien"));
        assert!(payload.uri.contains("k%C3%A4the%40example.com"));
    }
}
