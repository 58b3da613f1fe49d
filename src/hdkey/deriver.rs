//! Batch key derivation along the BIP44 path template
//!
//! The path is `m/44'/coin_type'/account'/0/index`: purpose and coin
//! type are fixed constants, the account level is the hardened index of
//! the logical account role, and the change level is pinned to the
//! external branch — internal/change addresses are not used.

use crate::coin::{AccountRole, Coin, Network};
use crate::hdkey::address::{
    bech32_address, canonical_address, p2sh_segwit_address, wif_encode, witness_program,
};
use crate::hdkey::extended::ExtendedPrivKey;
use crate::hdkey::HdKeyError;
use crate::seed::Seed;
use serde::{Deserialize, Serialize};

/// BIP44 purpose constant
pub const BIP44_PURPOSE: u32 = 44;

/// External (receive) change branch; internal change is never derived
pub const EXTERNAL_BRANCH: u32 = 0;

/// Largest permitted non-hardened leaf index
pub const MAX_NON_HARDENED_INDEX: u32 = 0x7fff_ffff;

/// Sanity ceiling on one batch, bounds memory and derivation time
pub const MAX_BATCH_COUNT: u32 = 10_000;

/// One fully-encoded derived key
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DerivedKey {
    /// Leaf index on the external branch
    pub index: u32,
    /// Private-key export string
    pub wif: String,
    /// Coin-canonical legacy address (cashaddr for Bitcoin Cash)
    pub p2pkh_address: String,
    /// P2SH-wrapped SegWit address
    pub p2sh_segwit_address: String,
    /// Witness program backing the P2SH-SegWit address, hex
    pub witness_program_hex: String,
    /// Native SegWit address
    pub bech32_address: String,
    /// Compressed public key, hex
    pub full_public_key: String,
}

/// Derives contiguous batches of account-level keys for one coin/network
#[derive(Clone, Copy, Debug)]
pub struct KeyDeriver {
    coin: Coin,
    network: Network,
}

impl KeyDeriver {
    pub fn new(coin: Coin, network: Network) -> Self {
        Self { coin, network }
    }

    /// Derive `count` keys for `account` starting at `idx_from`
    ///
    /// The returned slice preserves index order: `result[i]` is the key
    /// at `idx_from + i`. Any curve failure aborts the whole batch.
    pub fn derive_batch(
        &self,
        seed: &Seed,
        account: AccountRole,
        idx_from: u32,
        count: u32,
    ) -> Result<Vec<DerivedKey>, HdKeyError> {
        self.validate_range(idx_from, count)?;

        let external = self.external_branch(seed, account)?;
        let params = self.coin.network_params(self.network);

        let mut keys = Vec::with_capacity(count as usize);
        for offset in 0..count {
            let index = idx_from + offset;
            let leaf = external.ckd_normal(index)?;
            let public_key = leaf.public_key();

            keys.push(DerivedKey {
                index,
                wif: wif_encode(&params, leaf.secret_key()),
                p2pkh_address: canonical_address(self.coin, &params, &public_key)?,
                p2sh_segwit_address: p2sh_segwit_address(&params, &public_key),
                witness_program_hex: hex::encode(witness_program(&public_key)),
                bech32_address: bech32_address(&params, &public_key)?,
                full_public_key: hex::encode(public_key.serialize()),
            });
        }
        Ok(keys)
    }

    /// Walk `m/44'/coin_type'/account'/0`
    fn external_branch(
        &self,
        seed: &Seed,
        account: AccountRole,
    ) -> Result<ExtendedPrivKey, HdKeyError> {
        ExtendedPrivKey::master_from_seed(seed.as_bytes())?
            .ckd_hardened(BIP44_PURPOSE)?
            .ckd_hardened(self.coin.coin_type())?
            .ckd_hardened(account.account_index())?
            .ckd_normal(EXTERNAL_BRANCH)
    }

    fn validate_range(&self, idx_from: u32, count: u32) -> Result<(), HdKeyError> {
        if count == 0 {
            return Err(HdKeyError::InvalidIndex("count must be positive".to_string()));
        }
        if count > MAX_BATCH_COUNT {
            return Err(HdKeyError::InvalidIndex(format!(
                "count {} exceeds batch ceiling {}",
                count, MAX_BATCH_COUNT
            )));
        }
        let last = idx_from
            .checked_add(count - 1)
            .ok_or_else(|| HdKeyError::InvalidIndex("index range overflows u32".to_string()))?;
        if last > MAX_NON_HARDENED_INDEX {
            return Err(HdKeyError::InvalidIndex(format!(
                "last index {} exceeds non-hardened maximum {}",
                last, MAX_NON_HARDENED_INDEX
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Seed for the BIP39 "abandon .. about" reference mnemonic
    const VECTOR_SEED_HEX: &str =
        "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
         9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

    fn vector_seed() -> Seed {
        Seed::from_bytes(Coin::Bitcoin, hex::decode(VECTOR_SEED_HEX).unwrap()).unwrap()
    }

    fn mainnet_deriver() -> KeyDeriver {
        KeyDeriver::new(Coin::Bitcoin, Network::Mainnet)
    }

    #[test]
    fn test_reference_vector_client_index_0() {
        // m/44'/0'/0'/0/0 for the reference seed. These values are pinned
        // forever: funds are recoverable only if re-derivation reproduces
        // them exactly.
        let keys = mainnet_deriver()
            .derive_batch(&vector_seed(), AccountRole::Client, 0, 1)
            .unwrap();
        assert_eq!(keys.len(), 1);
        let key = &keys[0];
        assert_eq!(key.index, 0);
        assert_eq!(key.wif, "L4p2b9VAf8k5aUahF1JCJUzZkgNEAqLfq8DDdQiyAprQAKSbu8hf");
        assert_eq!(key.p2pkh_address, "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
        assert_eq!(key.p2sh_segwit_address, "3HkzTaFbEMWeJPLyNCNhPyGfZsVLDwdD3G");
        assert_eq!(key.bech32_address, "bc1qmxrw6qdh5g3ztfcwm0et5l8mvws4eva24kmp8m");
        assert_eq!(
            key.full_public_key,
            "03aaeb52dd7494c361049de67cc680e83ebcbbbdbeb13637d92cd845f70308af5e"
        );
    }

    #[test]
    fn test_reference_vector_indices_1_and_2() {
        let keys = mainnet_deriver()
            .derive_batch(&vector_seed(), AccountRole::Client, 1, 2)
            .unwrap();
        assert_eq!(keys[0].p2pkh_address, "1Ak8PffB2meyfYnbXZR9EGfLfFZVpzJvQP");
        assert_eq!(keys[0].bech32_address, "bc1qdtsnq885fjjj2agaza36cnl0ztg32wvxqg5x0c");
        assert_eq!(keys[1].p2pkh_address, "1MNF5RSaabFwcbtJirJwKnDytsXXEsVsNb");
        assert_eq!(keys[1].wif, "L4BL9ZGzuQJFoRqGfjsgHeYzD1C72y2VmJaY6sqdtaRkfxUFrJXu");
    }

    #[test]
    fn test_testnet_encodings() {
        let deriver = KeyDeriver::new(Coin::Bitcoin, Network::Testnet);
        let keys = deriver
            .derive_batch(&vector_seed(), AccountRole::Client, 0, 1)
            .unwrap();
        // Same key material, testnet version bytes
        assert_eq!(keys[0].wif, "cVB244V26CSLjv3xdR7KfoVdNufdqHSMuAMgjqBUfwWQR4WVFsky");
        assert_eq!(keys[0].p2pkh_address, "n1M8ZVQtL7QoFvGMg24D6b2ojWvFXCGpoS");
        assert_eq!(keys[0].p2sh_segwit_address, "2N9KCXKBcqp1zWAyX3Kza1vFvnDhW3JeiKT");
        assert_eq!(keys[0].bech32_address, "tb1qmxrw6qdh5g3ztfcwm0et5l8mvws4eva2lsqjug");
    }

    #[test]
    fn test_bitcoin_cash_canonical_address() {
        let seed = Seed::from_bytes(Coin::BitcoinCash, hex::decode(VECTOR_SEED_HEX).unwrap())
            .unwrap();
        let deriver = KeyDeriver::new(Coin::BitcoinCash, Network::Mainnet);
        let keys = deriver
            .derive_batch(&seed, AccountRole::Client, 0, 1)
            .unwrap();
        // m/44'/145'/0'/0/0: same hash160, cashaddr encoding
        assert_eq!(
            keys[0].p2pkh_address,
            "bitcoincash:qqyx49mu0kkn9ftfj6hje6g2wfer34yfnq5tahq3q6"
        );
        assert_eq!(keys[0].wif, "KxbEv3FeYig2afQp7QEA9R3gwqdTBFwAJJ6Ma7j1SkmZoxC9bAXZ");
    }

    #[test]
    fn test_determinism() {
        let deriver = mainnet_deriver();
        let a = deriver
            .derive_batch(&vector_seed(), AccountRole::Deposit, 0, 8)
            .unwrap();
        let b = deriver
            .derive_batch(&vector_seed(), AccountRole::Deposit, 0, 8)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_range_composition() {
        let deriver = mainnet_deriver();
        let all = deriver
            .derive_batch(&vector_seed(), AccountRole::Client, 0, 10)
            .unwrap();
        let tail = deriver
            .derive_batch(&vector_seed(), AccountRole::Client, 5, 5)
            .unwrap();
        assert_eq!(&all[5..], &tail[..]);
    }

    #[test]
    fn test_batch_order_matches_indices() {
        let keys = mainnet_deriver()
            .derive_batch(&vector_seed(), AccountRole::Payment, 3, 4)
            .unwrap();
        let indices: Vec<u32> = keys.iter().map(|k| k.index).collect();
        assert_eq!(indices, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_accounts_produce_disjoint_keys() {
        let deriver = mainnet_deriver();
        let client = deriver
            .derive_batch(&vector_seed(), AccountRole::Client, 0, 1)
            .unwrap();
        let deposit = deriver
            .derive_batch(&vector_seed(), AccountRole::Deposit, 0, 1)
            .unwrap();
        assert_ne!(client[0].full_public_key, deposit[0].full_public_key);
    }

    #[test]
    fn test_index_bounds_rejected() {
        let deriver = mainnet_deriver();
        let seed = vector_seed();

        assert!(deriver
            .derive_batch(&seed, AccountRole::Client, 0, 0)
            .is_err());
        assert!(deriver
            .derive_batch(&seed, AccountRole::Client, 0, MAX_BATCH_COUNT + 1)
            .is_err());
        assert!(deriver
            .derive_batch(&seed, AccountRole::Client, MAX_NON_HARDENED_INDEX, 2)
            .is_err());
        assert!(deriver
            .derive_batch(&seed, AccountRole::Client, u32::MAX, 2)
            .is_err());
        // Last index exactly at the bound is fine
        assert!(deriver
            .derive_batch(&seed, AccountRole::Client, MAX_NON_HARDENED_INDEX, 1)
            .is_ok());
    }
}
