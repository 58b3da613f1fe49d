//! Cryptographic primitives
//!
//! Hashing and ECDSA building blocks shared by key derivation,
//! address encoding, and the signing coordinator.

pub mod hash;
pub mod keys;

pub use hash::{hash160, sha256, sha256d};
pub use keys::{public_key_from_hex, public_key_hex, sign_digest, verify_digest, KeyError};
