//! Configuration for the two-factor plugin.

/// TOTP-specific options.
#[derive(Debug, Clone)]
pub struct TotpOptions {
    /// Number of digits in the TOTP code. Default: 6.
    pub digits: u32,
    /// Time step in seconds. Default: 30.
    pub period: u64,
    /// Accepted clock-skew window in steps on each side. Default: 1.
    pub skew: u32,
}

impl Default for TotpOptions {
    fn default() -> Self {
        Self {
            digits: 6,
            period: 30,
            skew: 1,
        }
    }
}

/// Recovery-code options.
#[derive(Debug, Clone)]
pub struct RecoveryCodeOptions {
    /// Number of codes per batch. Default: 10.
    pub amount: usize,
    /// Length of each code. Default: 10.
    pub length: usize,
}

impl Default for RecoveryCodeOptions {
    fn default() -> Self {
        Self {
            amount: 10,
            length: 10,
        }
    }
}

/// Configuration for the two-factor plugin.
#[derive(Debug, Clone)]
pub struct TwoFactorConfig {
    /// The issuer name for TOTP (displayed in authenticator apps).
    pub issuer: String,
    /// TOTP options.
    pub totp: TotpOptions,
    /// Recovery-code options.
    pub recovery: RecoveryCodeOptions,
    /// Remembered-device trust duration in days. Default: 30.
    pub remember_device_days: u32,
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            issuer: "Campus Auth".to_string(),
            totp: TotpOptions::default(),
            recovery: RecoveryCodeOptions::default(),
            remember_device_days: 30,
        }
    }
}

impl TwoFactorConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the issuer name.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets TOTP options.
    pub fn totp(mut self, options: TotpOptions) -> Self {
        self.totp = options;
        self
    }

    /// Sets recovery-code options.
    pub fn recovery(mut self, options: RecoveryCodeOptions) -> Self {
        self.recovery = options;
        self
    }

    /// Sets the remembered-device trust duration in days.
    pub fn remember_device_days(mut self, days: u32) -> Self {
        self.remember_device_days = days;
        self
    }
}
