//! BIP32 extended private keys
//!
//! An extended key is a secp256k1 secret key plus a 32-byte chain code.
//! Hardened derivation commits to the parent private key, normal
//! derivation to the parent public key. A child whose tweak falls
//! outside the curve order is a fatal derivation failure, never skipped.

use crate::hdkey::HdKeyError;
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// First hardened child index
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// A BIP32 extended private key
#[derive(Clone)]
pub struct ExtendedPrivKey {
    secret_key: SecretKey,
    chain_code: [u8; 32],
    depth: u8,
}

impl ExtendedPrivKey {
    /// Derive the master key from seed entropy
    pub fn master_from_seed(seed: &[u8]) -> Result<Self, HdKeyError> {
        if seed.is_empty() {
            return Err(HdKeyError::InvalidSeed("seed is empty".to_string()));
        }
        let digest = hmac_sha512(MASTER_HMAC_KEY, seed)?;

        let secret_key = SecretKey::from_slice(&digest[..32])
            .map_err(|e| HdKeyError::Derivation(format!("master key: {}", e)))?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&digest[32..]);

        Ok(Self {
            secret_key,
            chain_code,
            depth: 0,
        })
    }

    /// Derive a hardened child (`index'`); `index` must be below 2^31
    pub fn ckd_hardened(&self, index: u32) -> Result<Self, HdKeyError> {
        if index >= HARDENED_OFFSET {
            return Err(HdKeyError::InvalidIndex(format!(
                "hardened index {} out of range",
                index
            )));
        }
        self.ckd(HARDENED_OFFSET + index)
    }

    /// Derive a non-hardened child; `index` must be below 2^31
    pub fn ckd_normal(&self, index: u32) -> Result<Self, HdKeyError> {
        if index >= HARDENED_OFFSET {
            return Err(HdKeyError::InvalidIndex(format!(
                "non-hardened index {} out of range",
                index
            )));
        }
        self.ckd(index)
    }

    fn ckd(&self, index: u32) -> Result<Self, HdKeyError> {
        let mut data = Vec::with_capacity(37);
        if index >= HARDENED_OFFSET {
            data.push(0x00);
            data.extend_from_slice(&self.secret_key.secret_bytes());
        } else {
            data.extend_from_slice(&self.public_key().serialize());
        }
        data.extend_from_slice(&index.to_be_bytes());

        let digest = hmac_sha512(&self.chain_code, &data)?;

        let mut tweak_bytes = [0u8; 32];
        tweak_bytes.copy_from_slice(&digest[..32]);
        let tweak = Scalar::from_be_bytes(tweak_bytes)
            .map_err(|_| HdKeyError::Derivation(format!("child {}: tweak out of range", index)))?;
        let secret_key = self
            .secret_key
            .add_tweak(&tweak)
            .map_err(|e| HdKeyError::Derivation(format!("child {}: {}", index, e)))?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&digest[32..]);

        Ok(Self {
            secret_key,
            chain_code,
            depth: self.depth + 1,
        })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Compressed public key for this node
    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &self.secret_key)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64], HdKeyError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| HdKeyError::Derivation(format!("hmac init: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}
