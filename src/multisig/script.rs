//! Canonical M-of-N redeem scripts
//!
//! `OP_M <pubkey>... OP_N OP_CHECKMULTISIG` over compressed public
//! keys. Keys are sorted before the script is built, so the script and
//! its P2SH address are independent of contribution order.

use crate::coin::NetworkParams;
use crate::hdkey::p2sh_address_from_script;
use crate::multisig::MultisigError;
use serde::{Deserialize, Serialize};

const OP_BASE: u8 = 0x50;
const OP_CHECKMULTISIG: u8 = 0xae;
const PUSH_COMPRESSED_KEY: u8 = 0x21;
const COMPRESSED_KEY_LEN: usize = 33;

/// A composed multisig redeem script; immutable once built
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedeemScript {
    bytes: Vec<u8>,
}

impl RedeemScript {
    /// Build an M-of-N script from hex-encoded compressed public keys
    pub fn multisig(threshold: u8, pubkeys: &[String]) -> Result<Self, MultisigError> {
        if threshold == 0 {
            return Err(MultisigError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }
        let total = pubkeys.len();
        if total > 16 {
            return Err(MultisigError::InvalidThreshold(format!(
                "{} keys exceed the 16-key script limit",
                total
            )));
        }
        if usize::from(threshold) > total {
            return Err(MultisigError::InvalidThreshold(format!(
                "threshold {} exceeds key count {}",
                threshold, total
            )));
        }

        let mut decoded = Vec::with_capacity(total);
        for pubkey in pubkeys {
            let bytes = hex::decode(pubkey)
                .map_err(|_| MultisigError::InvalidPublicKey(pubkey.clone()))?;
            if bytes.len() != COMPRESSED_KEY_LEN || !matches!(bytes[0], 0x02 | 0x03) {
                return Err(MultisigError::InvalidPublicKey(pubkey.clone()));
            }
            decoded.push(bytes);
        }
        // Deterministic ordering makes composition commutative
        decoded.sort();
        decoded.dedup();
        if decoded.len() != total {
            return Err(MultisigError::DuplicateParticipant);
        }

        let mut bytes = Vec::with_capacity(3 + total * (COMPRESSED_KEY_LEN + 1));
        bytes.push(OP_BASE + threshold);
        for key in &decoded {
            bytes.push(PUSH_COMPRESSED_KEY);
            bytes.extend_from_slice(key);
        }
        bytes.push(OP_BASE + total as u8);
        bytes.push(OP_CHECKMULTISIG);

        Ok(Self { bytes })
    }

    /// Parse a script back from its hex form
    pub fn from_hex(hex_script: &str) -> Result<Self, MultisigError> {
        let bytes = hex::decode(hex_script)
            .map_err(|e| MultisigError::MalformedScript(e.to_string()))?;
        let script = Self { bytes };
        // Structural check: threshold/total opcodes and key pushes line up
        let total = script.total() as usize;
        let expected_len = 3 + total * (COMPRESSED_KEY_LEN + 1);
        if script.bytes.len() != expected_len
            || script.threshold() == 0
            || script.threshold() > script.total()
            || *script.bytes.last().unwrap_or(&0) != OP_CHECKMULTISIG
        {
            return Err(MultisigError::MalformedScript(
                "not a canonical multisig script".to_string(),
            ));
        }
        Ok(script)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Required signature count (M)
    pub fn threshold(&self) -> u8 {
        self.bytes.first().map(|b| b.wrapping_sub(OP_BASE)).unwrap_or(0)
    }

    /// Total key count (N)
    pub fn total(&self) -> u8 {
        if self.bytes.len() < 2 {
            return 0;
        }
        self.bytes[self.bytes.len() - 2].wrapping_sub(OP_BASE)
    }

    /// The hex public keys in script order
    pub fn pubkeys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.total() as usize);
        let mut pos = 1;
        while pos + 1 + COMPRESSED_KEY_LEN <= self.bytes.len()
            && self.bytes[pos] == PUSH_COMPRESSED_KEY
        {
            keys.push(hex::encode(&self.bytes[pos + 1..pos + 1 + COMPRESSED_KEY_LEN]));
            pos += 1 + COMPRESSED_KEY_LEN;
        }
        keys
    }

    /// P2SH address whose hash commits to this script
    pub fn p2sh_address(&self, params: &NetworkParams) -> String {
        p2sh_address_from_script(params, &self.bytes)
    }
}
