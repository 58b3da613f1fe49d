//! Address and WIF encodings
//!
//! All encodings operate on the compressed public key (or its HASH160)
//! of an already-derived node; none of them re-derive key material.

use crate::coin::{cashaddr, Coin, NetworkParams};
use crate::crypto::{hash160, sha256d};
use crate::hdkey::HdKeyError;
use bech32::{ToBase32, Variant};
use secp256k1::{PublicKey, SecretKey};

/// Base58check encode a versioned payload
fn base58check(payload: &[u8]) -> String {
    let mut bytes = payload.to_vec();
    let checksum = sha256d(&bytes);
    bytes.extend_from_slice(&checksum[..4]);
    bs58::encode(bytes).into_string()
}

/// Decode and verify a base58check string, returning the payload
fn base58check_decode(s: &str) -> Result<Vec<u8>, HdKeyError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| HdKeyError::InvalidWif(e.to_string()))?;
    if bytes.len() < 5 {
        return Err(HdKeyError::InvalidWif("too short".to_string()));
    }
    let (payload, checksum) = bytes.split_at(bytes.len() - 4);
    if sha256d(payload)[..4] != *checksum {
        return Err(HdKeyError::InvalidWif("bad checksum".to_string()));
    }
    Ok(payload.to_vec())
}

/// WIF export string for a secret key (compressed-pubkey flag set)
pub fn wif_encode(params: &NetworkParams, secret_key: &SecretKey) -> String {
    let mut payload = vec![params.wif_version];
    payload.extend_from_slice(&secret_key.secret_bytes());
    payload.push(0x01);
    base58check(&payload)
}

/// Decode a WIF export string back into a secret key
pub fn wif_decode(params: &NetworkParams, wif: &str) -> Result<SecretKey, HdKeyError> {
    let payload = base58check_decode(wif)?;
    if payload.first() != Some(&params.wif_version) {
        return Err(HdKeyError::InvalidWif(format!(
            "wrong version byte {:#04x}",
            payload.first().copied().unwrap_or(0)
        )));
    }
    let key_bytes = match payload.len() {
        // version + 32-byte key + compressed flag
        34 if payload[33] == 0x01 => &payload[1..33],
        33 => &payload[1..33],
        _ => return Err(HdKeyError::InvalidWif("bad length".to_string())),
    };
    SecretKey::from_slice(key_bytes).map_err(|e| HdKeyError::InvalidWif(e.to_string()))
}

/// Legacy pay-to-pubkey-hash address
pub fn p2pkh_address(params: &NetworkParams, public_key: &PublicKey) -> String {
    let mut payload = vec![params.p2pkh_version];
    payload.extend_from_slice(&hash160(&public_key.serialize()));
    base58check(&payload)
}

/// Version-0 witness program for a public key (`OP_0 <20-byte hash>`)
pub fn witness_program(public_key: &PublicKey) -> Vec<u8> {
    let mut program = vec![0x00, 0x14];
    program.extend_from_slice(&hash160(&public_key.serialize()));
    program
}

/// P2SH-wrapped SegWit address (the P2SH hash of the witness program)
pub fn p2sh_segwit_address(params: &NetworkParams, public_key: &PublicKey) -> String {
    p2sh_address_from_script(params, &witness_program(public_key))
}

/// P2SH address for an arbitrary script (redeem scripts included)
pub fn p2sh_address_from_script(params: &NetworkParams, script: &[u8]) -> String {
    let mut payload = vec![params.p2sh_version];
    payload.extend_from_slice(&hash160(script));
    base58check(&payload)
}

/// Native SegWit v0 address
pub fn bech32_address(
    params: &NetworkParams,
    public_key: &PublicKey,
) -> Result<String, HdKeyError> {
    let program = hash160(&public_key.serialize());
    let witness_version =
        bech32::u5::try_from_u8(0).map_err(|e| HdKeyError::AddressEncoding(e.to_string()))?;
    let mut data = vec![witness_version];
    data.extend(program.to_base32());
    bech32::encode(params.bech32_hrp, data, Variant::Bech32)
        .map_err(|e| HdKeyError::AddressEncoding(e.to_string()))
}

/// Coin-canonical address for a public key
///
/// Bitcoin Cash re-encodes the same HASH160 as a cashaddr; everything
/// else keeps the legacy P2PKH form.
pub fn canonical_address(
    coin: Coin,
    params: &NetworkParams,
    public_key: &PublicKey,
) -> Result<String, HdKeyError> {
    match coin {
        Coin::BitcoinCash => {
            let prefix = params.cashaddr_prefix.ok_or_else(|| {
                HdKeyError::AddressEncoding("no cashaddr prefix for network".to_string())
            })?;
            let hash: [u8; 20] = hash160(&public_key.serialize())
                .try_into()
                .map_err(|_| HdKeyError::AddressEncoding("bad hash length".to_string()))?;
            Ok(cashaddr::encode_p2pkh(prefix, &hash))
        }
        Coin::Bitcoin => Ok(p2pkh_address(params, public_key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Network;
    use secp256k1::Secp256k1;

    fn fixed_key() -> (SecretKey, PublicKey) {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(
            &hex::decode("e284129cc0922579a535bbf4d1a3b25773090d28c909bc0fed73b5e0222cc372")
                .unwrap(),
        )
        .unwrap();
        let pk = PublicKey::from_secret_key(&secp, &sk);
        (sk, pk)
    }

    fn mainnet() -> NetworkParams {
        Coin::Bitcoin.network_params(Network::Mainnet)
    }

    #[test]
    fn test_wif_round_trip() {
        let (sk, _) = fixed_key();
        let params = mainnet();
        let wif = wif_encode(&params, &sk);
        assert_eq!(wif, "L4p2b9VAf8k5aUahF1JCJUzZkgNEAqLfq8DDdQiyAprQAKSbu8hf");
        assert_eq!(wif_decode(&params, &wif).unwrap(), sk);
    }

    #[test]
    fn test_wif_wrong_network_rejected() {
        let (sk, _) = fixed_key();
        let wif = wif_encode(&mainnet(), &sk);
        let testnet = Coin::Bitcoin.network_params(Network::Testnet);
        assert!(matches!(
            wif_decode(&testnet, &wif),
            Err(HdKeyError::InvalidWif(_))
        ));
    }

    #[test]
    fn test_wif_corruption_rejected() {
        let (sk, _) = fixed_key();
        let params = mainnet();
        let mut wif = wif_encode(&params, &sk);
        wif.replace_range(5..6, if &wif[5..6] == "a" { "b" } else { "a" });
        assert!(wif_decode(&params, &wif).is_err());
    }

    #[test]
    fn test_address_encodings() {
        let (_, pk) = fixed_key();
        let params = mainnet();
        assert_eq!(p2pkh_address(&params, &pk), "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
        assert_eq!(
            p2sh_segwit_address(&params, &pk),
            "3HkzTaFbEMWeJPLyNCNhPyGfZsVLDwdD3G"
        );
        assert_eq!(
            bech32_address(&params, &pk).unwrap(),
            "bc1qmxrw6qdh5g3ztfcwm0et5l8mvws4eva24kmp8m"
        );
    }

    #[test]
    fn test_witness_program_shape() {
        let (_, pk) = fixed_key();
        let program = witness_program(&pk);
        assert_eq!(program.len(), 22);
        assert_eq!(&program[..2], &[0x00, 0x14]);
    }
}
