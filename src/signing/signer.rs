//! The signing primitive
//!
//! Signs a transaction with the keys one wallet role possesses and
//! reports whether every input now meets its signature threshold. Keys
//! held by other roles are simply absent here; their signatures arrive
//! through earlier or later passes over the artifact.

use crate::coin::{Coin, Network};
use crate::crypto::{public_key_from_hex, public_key_hex, sign_digest, verify_digest};
use crate::hdkey::{bech32_address, canonical_address, p2sh_segwit_address};
use crate::multisig::RedeemScript;
use crate::signing::transaction::{InputSignature, PrevOutput, RawTransaction};
use crate::signing::SigningError;
use secp256k1::SecretKey;

/// Result of one signing pass
#[derive(Clone, Debug)]
pub struct SignOutcome {
    /// Re-encoded transaction carrying all signatures so far
    pub hex: String,
    /// True when every input meets its threshold
    pub is_signed: bool,
}

/// Sign `tx` with this role's keys
///
/// Multisig inputs (those carrying a redeem script) accumulate one
/// signature per owned key present in the script; a pubkey that already
/// signed is skipped, never duplicated. Single-key inputs are signed by
/// the owned key whose address matches the spent output. Returns the
/// re-encoded transaction and the threshold verdict; an unmet threshold
/// is a normal outcome, not an error.
pub fn sign_transaction(
    tx: &RawTransaction,
    prev_outputs: &[PrevOutput],
    keys: &[SecretKey],
    coin: Coin,
    network: Network,
) -> Result<SignOutcome, SigningError> {
    let mut tx = tx.clone();
    let mut all_satisfied = true;

    for index in 0..tx.inputs.len() {
        let prev = find_prev_output(&tx, index, prev_outputs)?;
        let satisfied = match tx.inputs[index].redeem_script.clone() {
            Some(script_hex) => sign_multisig_input(&mut tx, index, &script_hex, keys)?,
            None => sign_single_input(&mut tx, index, &prev, keys, coin, network)?,
        };
        all_satisfied &= satisfied;
    }

    Ok(SignOutcome {
        hex: tx.encode_hex()?,
        is_signed: all_satisfied,
    })
}

fn find_prev_output(
    tx: &RawTransaction,
    index: usize,
    prev_outputs: &[PrevOutput],
) -> Result<PrevOutput, SigningError> {
    let input = &tx.inputs[index];
    prev_outputs
        .iter()
        .find(|p| p.txid == input.prev_txid && p.vout == input.prev_vout)
        .cloned()
        .ok_or_else(|| SigningError::MissingPrevOutput {
            txid: input.prev_txid.clone(),
            vout: input.prev_vout,
        })
}

/// Contribute owned-key signatures to a multisig input
fn sign_multisig_input(
    tx: &mut RawTransaction,
    index: usize,
    script_hex: &str,
    keys: &[SecretKey],
) -> Result<bool, SigningError> {
    let script = RedeemScript::from_hex(script_hex)?;
    let script_keys = script.pubkeys();
    let digest = tx.sighash(index, script_hex)?;

    for key in keys {
        let pubkey = public_key_hex(key);
        if !script_keys.contains(&pubkey) {
            continue;
        }
        if tx.inputs[index].signatures.iter().any(|s| s.pubkey == pubkey) {
            log::warn!("pubkey {} already signed input {}, skipping", pubkey, index);
            continue;
        }
        let signature = sign_digest(key, &digest)
            .map_err(|e| SigningError::Primitive(e.to_string()))?;
        tx.inputs[index].signatures.push(InputSignature {
            pubkey,
            signature: hex::encode(signature),
        });
    }

    // Count only signatures that verify against script keys; order the
    // list to match key order in the script.
    let mut valid: Vec<InputSignature> = Vec::new();
    for script_key in &script_keys {
        if let Some(sig) = tx.inputs[index]
            .signatures
            .iter()
            .find(|s| &s.pubkey == script_key)
        {
            let pk = public_key_from_hex(&sig.pubkey)
                .map_err(|e| SigningError::Primitive(e.to_string()))?;
            let sig_bytes = hex::decode(&sig.signature)
                .map_err(|e| SigningError::MalformedArtifact(format!("signature: {}", e)))?;
            let ok = verify_digest(&pk, &digest, &sig_bytes)
                .map_err(|e| SigningError::Primitive(e.to_string()))?;
            if ok {
                valid.push(sig.clone());
            } else {
                log::warn!("discarding invalid signature by {} on input {}", sig.pubkey, index);
            }
        }
    }
    let satisfied = valid.len() >= usize::from(script.threshold());
    tx.inputs[index].signatures = valid;
    Ok(satisfied)
}

/// Sign a single-key input with the owned key matching the spent address
fn sign_single_input(
    tx: &mut RawTransaction,
    index: usize,
    prev: &PrevOutput,
    keys: &[SecretKey],
    coin: Coin,
    network: Network,
) -> Result<bool, SigningError> {
    let params = coin.network_params(network);
    let key = keys
        .iter()
        .find(|k| {
            let secp = secp256k1::Secp256k1::new();
            let pk = secp256k1::PublicKey::from_secret_key(&secp, k);
            canonical_address(coin, &params, &pk)
                .map(|a| a == prev.address)
                .unwrap_or(false)
                || p2sh_segwit_address(&params, &pk) == prev.address
                || bech32_address(&params, &pk)
                    .map(|a| a == prev.address)
                    .unwrap_or(false)
        })
        .ok_or_else(|| SigningError::NoKeyForAddress(prev.address.clone()))?;

    let digest = tx.sighash(index, &prev.address)?;
    let signature =
        sign_digest(key, &digest).map_err(|e| SigningError::Primitive(e.to_string()))?;
    tx.inputs[index].signatures = vec![InputSignature {
        pubkey: public_key_hex(key),
        signature: hex::encode(signature),
    }];
    Ok(true)
}
