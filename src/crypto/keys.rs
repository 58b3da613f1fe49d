//! ECDSA primitives for transaction signing
//!
//! Thin wrappers over secp256k1 used by the HD deriver and the
//! signing coordinator. Signatures are compact (64-byte) encoded.

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// Parse a compressed public key from a hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Compressed public key for a secret key, hex-encoded
pub fn public_key_hex(secret_key: &SecretKey) -> String {
    let secp = Secp256k1::new();
    hex::encode(PublicKey::from_secret_key(&secp, secret_key).serialize())
}

/// Sign a 32-byte digest with a secret key, returning a compact signature
pub fn sign_digest(secret_key: &SecretKey, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature over a 32-byte digest
pub fn verify_digest(
    public_key: &PublicKey,
    digest: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;
    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}
