//! Recovery-code management.
//!
//! Pre-generated one-time backup credentials for bypassing TOTP when the
//! authenticator device is unavailable. Comparison is case-insensitive and
//! ignores separator characters; a consumed code is removed from the set
//! and can never be used again.

use rand::Rng;
use rand::rngs::OsRng;
use std::collections::HashSet;

/// Alphabet without ambiguous characters (no 0/O, 1/I/L).
const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Recovery-code generator and consumer.
#[derive(Debug, Clone)]
pub struct RecoveryCodeManager {
    /// Number of codes per batch.
    amount: usize,
    /// Length of each code.
    length: usize,
}

impl RecoveryCodeManager {
    /// Creates a new recovery-code manager.
    pub fn new(amount: usize, length: usize) -> Self {
        Self { amount, length }
    }

    /// Generates a batch of codes, unique within the batch.
    ///
    /// A regenerated batch is meant to replace the stored set wholesale;
    /// previously issued codes become invalid.
    pub fn generate(&self) -> Vec<String> {
        let mut seen = HashSet::with_capacity(self.amount);
        let mut codes = Vec::with_capacity(self.amount);
        while codes.len() < self.amount {
            let code: String = (0..self.length)
                .map(|_| {
                    let idx = OsRng.gen_range(0..CHARSET.len());
                    CHARSET[idx] as char
                })
                .collect();
            if seen.insert(code.clone()) {
                codes.push(code);
            }
        }
        codes
    }

    /// Consumes a submitted code from the stored set.
    ///
    /// True iff the normalized code is a member; on success exactly that
    /// code is removed. Returns false without touching the set otherwise.
    pub fn consume(&self, codes: &mut Vec<String>, submitted: &str) -> bool {
        let wanted = normalize(submitted);
        if wanted.is_empty() {
            return false;
        }
        match codes.iter().position(|c| normalize(c) == wanted) {
            Some(pos) => {
                codes.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl Default for RecoveryCodeManager {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

/// Upper-cases and strips the separators users tend to type.
fn normalize(code: &str) -> String {
    code.to_uppercase().replace(['-', ' '], "")
}
