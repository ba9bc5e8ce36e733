//! # Campus Auth Password Plugin
//!
//! Password hashing, verification and policy for Campus Auth. Hashing uses
//! bcrypt; verification is the salted, constant-time comparison the bcrypt
//! format provides. Cleartext passwords are never compared or stored.

use campus_auth_core::error::{AuthError, AuthResult};

/// Password policy configuration.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Minimum password length.
    pub min_length: usize,
    /// Require uppercase letters.
    pub require_uppercase: bool,
    /// Require lowercase letters.
    pub require_lowercase: bool,
    /// Require numbers.
    pub require_numbers: bool,
    /// Require special characters.
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            require_uppercase: false,
            require_lowercase: false,
            require_numbers: false,
            require_special: false,
        }
    }
}

impl PasswordPolicy {
    /// Creates a new policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets minimum password length.
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    /// Requires uppercase letters.
    pub fn require_uppercase(mut self) -> Self {
        self.require_uppercase = true;
        self
    }

    /// Requires lowercase letters.
    pub fn require_lowercase(mut self) -> Self {
        self.require_lowercase = true;
        self
    }

    /// Requires numbers.
    pub fn require_numbers(mut self) -> Self {
        self.require_numbers = true;
        self
    }

    /// Requires special characters.
    pub fn require_special(mut self) -> Self {
        self.require_special = true;
        self
    }

    /// Validates a password against the policy.
    pub fn validate(&self, password: &str) -> AuthResult<()> {
        if password.len() < self.min_length {
            return Err(AuthError::weak_password(format!(
                "must be at least {} characters",
                self.min_length
            )));
        }

        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(AuthError::weak_password(
                "must contain at least one uppercase letter",
            ));
        }

        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            return Err(AuthError::weak_password(
                "must contain at least one lowercase letter",
            ));
        }

        if self.require_numbers && !password.chars().any(|c| c.is_numeric()) {
            return Err(AuthError::weak_password("must contain at least one number"));
        }

        if self.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            return Err(AuthError::weak_password(
                "must contain at least one special character",
            ));
        }

        Ok(())
    }
}

/// bcrypt-backed password hasher.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Creates a hasher with the given bcrypt cost.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hashes a password.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        bcrypt::hash(password, self.cost).map_err(|e| AuthError::internal(e.to_string()))
    }

    /// Verifies a password against a stored hash.
    ///
    /// Returns false on mismatch or a malformed hash; a normal mismatch is
    /// not an error.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
