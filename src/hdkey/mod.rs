//! Hierarchical deterministic key derivation (BIP32/BIP44)
//!
//! Walks `m/44'/coin_type'/account'/0/index` from the master seed and
//! produces every address encoding a wallet role needs. Derivation is
//! bit-for-bit reproducible: the same seed, account, and index always
//! yield the same key material, on every run and every machine.

pub mod address;
pub mod deriver;
pub mod extended;

pub use address::{
    bech32_address, canonical_address, p2pkh_address, p2sh_address_from_script,
    p2sh_segwit_address, wif_decode, wif_encode, witness_program,
};
pub use deriver::{DerivedKey, KeyDeriver, MAX_BATCH_COUNT, MAX_NON_HARDENED_INDEX};
pub use extended::ExtendedPrivKey;

use thiserror::Error;

/// Errors raised by derivation and address encoding
#[derive(Error, Debug)]
pub enum HdKeyError {
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
    #[error("Invalid WIF: {0}")]
    InvalidWif(String),
    #[error("Address encoding failed: {0}")]
    AddressEncoding(String),
    #[error("Curve derivation failed: {0}")]
    Derivation(String),
}
