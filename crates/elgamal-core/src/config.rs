//! Engine configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default modulus size in bits
pub const DEFAULT_PRIME_BITS: usize = 512;

/// Default Miller-Rabin witness count for the safe prime
pub const DEFAULT_ROUNDS: usize = 512;

/// Default Miller-Rabin witness count when screening prime candidates
pub const DEFAULT_CANDIDATE_ROUNDS: usize = 32;

/// Default cap on every randomized retry loop
pub const DEFAULT_MAX_ATTEMPTS: usize = 100_000;

/// Default frame marker
pub const DEFAULT_MARKER: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

/// Smallest modulus the engine accepts
pub const MIN_PRIME_BITS: usize = 16;

/// Tunables for key generation, signing and framing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bit length `L` of the safe prime `p`
    pub prime_bits: usize,

    /// Witness rounds used to accept `p`
    pub rounds: usize,

    /// Witness rounds used inside probable prime generation
    pub candidate_rounds: usize,

    /// Upper bound for each retry loop
    pub max_attempts: usize,

    /// Four-byte frame delimiter
    #[serde(with = "marker_serde")]
    pub marker: [u8; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prime_bits: DEFAULT_PRIME_BITS,
            rounds: DEFAULT_ROUNDS,
            candidate_rounds: DEFAULT_CANDIDATE_ROUNDS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            marker: DEFAULT_MARKER,
        }
    }
}

impl EngineConfig {
    /// Create a validated configuration with default framing
    pub fn new(prime_bits: usize, rounds: usize) -> Result<Self> {
        let config = Self {
            prime_bits,
            rounds,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can drive key generation
    pub fn validate(&self) -> Result<()> {
        if self.prime_bits < MIN_PRIME_BITS {
            return Err(Error::InvalidConfig(format!(
                "prime_bits must be at least {}, got {}",
                MIN_PRIME_BITS, self.prime_bits
            )));
        }
        if self.rounds == 0 || self.candidate_rounds == 0 {
            return Err(Error::InvalidConfig(
                "Miller-Rabin round counts must be positive".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be positive".into()));
        }
        Ok(())
    }
}

mod marker_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(marker: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(marker))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 4], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(text.trim()).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Marker must be exactly 4 bytes"))
    }
}
