//! Coin-generic transaction model
//!
//! The toolchain does not re-specify each coin's consensus
//! serialization; artifacts carry transactions in a canonical JSON form
//! wrapped in hex. The signing digest for an input covers the outpoints,
//! the outputs, the input position, and the script (or address) being
//! satisfied, and never the signatures themselves, so every signer of a
//! multisig input signs the same digest.

use crate::crypto::sha256d;
use crate::signing::SigningError;
use serde::{Deserialize, Serialize};

/// A signature contributed to one input
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputSignature {
    /// Compressed public key of the signer, hex
    pub pubkey: String,
    /// Compact ECDSA signature, hex
    pub signature: String,
}

/// One transaction input
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxInput {
    pub prev_txid: String,
    pub prev_vout: u32,
    /// Attached by the first multisig signer, carried to the rest
    pub redeem_script: Option<String>,
    pub signatures: Vec<InputSignature>,
}

/// One transaction output
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxOutput {
    pub address: String,
    pub amount: u64,
}

/// Metadata for an output being spent, supplied by the watch wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrevOutput {
    pub txid: String,
    pub vout: u32,
    /// Address the output pays to; identifies the owning key
    pub address: String,
    pub amount: u64,
}

/// A transaction in the toolchain's canonical form
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawTransaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl RawTransaction {
    /// Build an unsigned transaction spending the given outputs
    pub fn unsigned(prev_outputs: &[PrevOutput], outputs: Vec<TxOutput>) -> Self {
        Self {
            inputs: prev_outputs
                .iter()
                .map(|p| TxInput {
                    prev_txid: p.txid.clone(),
                    prev_vout: p.vout,
                    redeem_script: None,
                    signatures: Vec::new(),
                })
                .collect(),
            outputs,
        }
    }

    /// Hex wire form carried in artifact files
    pub fn encode_hex(&self) -> Result<String, SigningError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| SigningError::MalformedArtifact(e.to_string()))?;
        Ok(hex::encode(json))
    }

    /// Decode the hex wire form
    pub fn decode_hex(hex_tx: &str) -> Result<Self, SigningError> {
        let bytes = hex::decode(hex_tx.trim())
            .map_err(|e| SigningError::MalformedArtifact(format!("tx not hex: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SigningError::MalformedArtifact(format!("tx not decodable: {}", e)))
    }

    /// Signing digest for one input
    ///
    /// `script` is the redeem script hex for a multisig input, or the
    /// spent address for a single-key input.
    pub fn sighash(&self, input_index: usize, script: &str) -> Result<Vec<u8>, SigningError> {
        let input = self.inputs.get(input_index).ok_or_else(|| {
            SigningError::MalformedArtifact(format!("no input at index {}", input_index))
        })?;
        let outpoints: Vec<(&str, u32)> = self
            .inputs
            .iter()
            .map(|i| (i.prev_txid.as_str(), i.prev_vout))
            .collect();
        let payload = serde_json::to_vec(&(
            &outpoints,
            &self.outputs,
            input_index,
            &input.prev_txid,
            script,
        ))
        .map_err(|e| SigningError::Primitive(e.to_string()))?;
        Ok(sha256d(&payload))
    }

    /// Transaction identifier: digest over outpoints and outputs only,
    /// stable across signing passes
    pub fn txid(&self) -> Result<String, SigningError> {
        let outpoints: Vec<(&str, u32)> = self
            .inputs
            .iter()
            .map(|i| (i.prev_txid.as_str(), i.prev_vout))
            .collect();
        let payload = serde_json::to_vec(&(&outpoints, &self.outputs))
            .map_err(|e| SigningError::Primitive(e.to_string()))?;
        Ok(hex::encode(sha256d(&payload)))
    }

    pub fn total_output_amount(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_prev() -> Vec<PrevOutput> {
        vec![PrevOutput {
            txid: "aa".repeat(32),
            vout: 1,
            address: "3AbCd".to_string(),
            amount: 5_000,
        }]
    }

    fn sample_tx() -> RawTransaction {
        RawTransaction::unsigned(
            &sample_prev(),
            vec![TxOutput {
                address: "1Dest".to_string(),
                amount: 4_900,
            }],
        )
    }

    #[test]
    fn test_hex_round_trip() {
        let tx = sample_tx();
        let decoded = RawTransaction::decode_hex(&tx.encode_hex().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_sighash_ignores_signatures() {
        let mut tx = sample_tx();
        let before = tx.sighash(0, "52ae").unwrap();
        tx.inputs[0].signatures.push(InputSignature {
            pubkey: "02ab".to_string(),
            signature: "cd".to_string(),
        });
        assert_eq!(tx.sighash(0, "52ae").unwrap(), before);
    }

    #[test]
    fn test_sighash_depends_on_script_and_index() {
        let tx = sample_tx();
        assert_ne!(tx.sighash(0, "52ae").unwrap(), tx.sighash(0, "51ae").unwrap());
        assert!(tx.sighash(1, "52ae").is_err());
    }

    #[test]
    fn test_txid_stable_across_signing() {
        let mut tx = sample_tx();
        let id = tx.txid().unwrap();
        tx.inputs[0].redeem_script = Some("52ae".to_string());
        tx.inputs[0].signatures.push(InputSignature {
            pubkey: "02ab".to_string(),
            signature: "cd".to_string(),
        });
        assert_eq!(tx.txid().unwrap(), id);
    }

    #[test]
    fn test_garbage_hex_rejected() {
        assert!(RawTransaction::decode_hex("zzzz").is_err());
        assert!(RawTransaction::decode_hex("00ff00").is_err());
    }
}
