//! Master seed management
//!
//! Each coin has at most one master seed. The seed is generated once on
//! the keygen or sign cold wallet, persisted through an injected
//! repository, and never mutated. Wherever the seed crosses a process or
//! file boundary it travels as base64 text; the round trip is exact.

pub mod mnemonic;

use crate::coin::Coin;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recommended entropy length in bytes (matches a BIP39 512-bit seed)
pub const SEED_LENGTH: usize = 64;

/// Shortest seed accepted from an operator
pub const MIN_SEED_LENGTH: usize = 16;

/// Seed-related errors
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Invalid seed encoding: {0}")]
    InvalidSeedEncoding(String),
    #[error("Seed too short: {got} bytes, minimum {min}")]
    SeedTooShort { got: usize, min: usize },
    #[error("Repository operation '{op}' failed: {message}")]
    Repository { op: &'static str, message: String },
}

/// Coin-scoped master entropy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seed {
    pub coin: Coin,
    bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Seed {
    /// Wrap raw entropy, enforcing the minimum length
    pub fn from_bytes(coin: Coin, bytes: Vec<u8>) -> Result<Self, SeedError> {
        if bytes.len() < MIN_SEED_LENGTH {
            return Err(SeedError::SeedTooShort {
                got: bytes.len(),
                min: MIN_SEED_LENGTH,
            });
        }
        Ok(Self {
            coin,
            bytes,
            created_at: Utc::now(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Text-safe encoding used across process and file boundaries
    pub fn encode(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Decode the text-safe encoding back into a seed
    pub fn decode(coin: Coin, text: &str) -> Result<Self, SeedError> {
        let bytes = BASE64
            .decode(text.trim())
            .map_err(|e| SeedError::InvalidSeedEncoding(e.to_string()))?;
        Self::from_bytes(coin, bytes)
    }
}

/// Persisted form of a seed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredSeed {
    pub coin: Coin,
    pub seed_b64: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence collaborator for the single per-coin seed row
pub trait SeedRepository {
    /// Read the one persisted seed, if any
    fn get_one(&self) -> Result<Option<StoredSeed>, SeedError>;

    /// Insert the seed; at most one row may ever exist
    fn insert(&mut self, seed: StoredSeed) -> Result<(), SeedError>;
}

/// Generates, stores, and retrieves the master seed for one coin
pub struct SeedManager<R: SeedRepository> {
    coin: Coin,
    repository: R,
}

impl<R: SeedRepository> SeedManager<R> {
    pub fn new(coin: Coin, repository: R) -> Self {
        Self { coin, repository }
    }

    /// Generate a fresh seed, or return the existing one if already stored
    ///
    /// Generation is idempotent: a second call never replaces the seed,
    /// because re-derivation from a different seed would orphan every
    /// address already handed out.
    pub fn generate(&mut self) -> Result<Seed, SeedError> {
        if let Some(existing) = self.retrieve()? {
            log::info!("seed already exists for {}, keeping it", self.coin);
            return Ok(existing);
        }

        let mut bytes = vec![0u8; SEED_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        let seed = Seed::from_bytes(self.coin, bytes)?;
        self.persist(&seed)?;
        Ok(seed)
    }

    /// Store operator-supplied seed material (recovery / development path)
    pub fn store(&mut self, encoded: &str) -> Result<Seed, SeedError> {
        let seed = Seed::decode(self.coin, encoded)?;
        self.persist(&seed)?;
        Ok(seed)
    }

    /// Recover the seed from a BIP39 mnemonic phrase
    pub fn recover(&mut self, phrase: &str, passphrase: &str) -> Result<Seed, SeedError> {
        let bytes = mnemonic::mnemonic_to_seed(phrase, passphrase);
        let seed = Seed::from_bytes(self.coin, bytes.to_vec())?;
        self.persist(&seed)?;
        Ok(seed)
    }

    /// Read the persisted seed for this coin
    pub fn retrieve(&self) -> Result<Option<Seed>, SeedError> {
        match self.repository.get_one()? {
            Some(stored) => {
                let mut seed = Seed::decode(stored.coin, &stored.seed_b64)?;
                seed.created_at = stored.created_at;
                Ok(Some(seed))
            }
            None => Ok(None),
        }
    }

    fn persist(&mut self, seed: &Seed) -> Result<(), SeedError> {
        self.repository.insert(StoredSeed {
            coin: seed.coin,
            seed_b64: seed.encode(),
            created_at: seed.created_at,
        })
    }
}
