//! Hashing utilities for the custody toolchain
//!
//! Provides the SHA-256 and HASH160 primitives used for address
//! encoding, redeem-script hashing, and transaction digests.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for base58check checksums and signing digests
pub fn sha256d(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

/// Computes HASH160 (RIPEMD-160 of SHA-256)
/// Used for P2PKH/P2SH address payloads and witness programs
pub fn hash160(data: &[u8]) -> Vec<u8> {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));
    ripemd.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            hex::encode(hash),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256d() {
        let hash = sha256d(b"hello world");
        assert_eq!(hash.len(), 32);
        assert_ne!(hash, sha256(b"hello world"));
    }

    #[test]
    fn test_hash160() {
        // HASH160 of the empty string is a fixed, well-known value
        let hash = hash160(b"");
        assert_eq!(hash.len(), 20);
        assert_eq!(
            hex::encode(hash),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }
}
