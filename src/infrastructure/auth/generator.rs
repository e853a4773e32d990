//! API key secret generation
//!
//! Secrets are `sk-` plus 48 random alphanumeric characters drawn from a
//! cryptographically secure source. The first 10 characters of the full
//! plaintext form the lookup prefix: short enough to keep prefix buckets
//! cheap to index, long enough that the remaining ~62^41 space behind a
//! bucket stays unsearchable.

use rand::{distributions::Alphanumeric, Rng};

/// Length of the unhashed lookup prefix kept alongside the digest.
pub const KEY_PREFIX_LEN: usize = 10;

/// Number of random characters after the literal prefix.
const KEY_RANDOM_LEN: usize = 48;

/// Literal marker for operator recognizability.
const KEY_LITERAL_PREFIX: &str = "sk-";

/// Generates plaintext secrets and derives lookup prefixes.
#[derive(Debug, Clone, Default)]
pub struct KeyGenerator;

impl KeyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh plaintext secret.
    ///
    /// `ThreadRng` is a CSPRNG; this must never be replaced with a
    /// non-cryptographic generator.
    pub fn generate(&self) -> String {
        let random_part: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(KEY_RANDOM_LEN)
            .map(char::from)
            .collect();

        format!("{}{}", KEY_LITERAL_PREFIX, random_part)
    }

    /// Derive the fixed-length lookup prefix of a plaintext secret.
    pub fn prefix_of(&self, key: &str) -> String {
        key.chars().take(KEY_PREFIX_LEN).collect()
    }
}
