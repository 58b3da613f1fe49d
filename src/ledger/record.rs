//! Key records and the address/key status lifecycle
//!
//! Every derived key is tracked through an ordered lifecycle. Status
//! only moves forward, and each pipeline stage selects its input by
//! exact status match, so a killed process resumes safely on re-run.

use crate::coin::{AccountRole, Coin};
use crate::hdkey::DerivedKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a derived key
///
/// `MultisigAddressGenerated` is reached only by keys under a multisig
/// account policy; non-multisig keys terminate at `AddressExported`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyStatus {
    /// Derived and persisted, not yet known to the node wallet
    HdKeyGenerated,
    /// Private key registered with the node wallet
    PrivKeyImported,
    /// Written to an address export file for the watch wallet
    AddressExported,
    /// Redeem script and multisig address attached
    MultisigAddressGenerated,
}

impl KeyStatus {
    /// Whether a transition to `next` moves strictly forward
    pub fn can_advance_to(&self, next: KeyStatus) -> bool {
        next > *self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::HdKeyGenerated => "hd_key_generated",
            KeyStatus::PrivKeyImported => "priv_key_imported",
            KeyStatus::AddressExported => "address_exported",
            KeyStatus::MultisigAddressGenerated => "multisig_address_generated",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One derived HD key with all its encodings and lifecycle state
///
/// Owned and mutated only by the wallet role that generated it; other
/// roles see it read-only through exported files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyRecord {
    pub coin: Coin,
    pub account: AccountRole,
    pub index: u32,
    /// Private-key export string; unique per key, used as the bulk
    /// status-update key
    pub wif: String,
    pub p2pkh_address: String,
    pub p2sh_segwit_address: String,
    pub bech32_address: String,
    pub full_public_key: String,
    /// Set once a redeem script has been composed for this key's account
    pub multisig_address: Option<String>,
    pub redeem_script: Option<String>,
    pub status: KeyStatus,
    pub updated_at: DateTime<Utc>,
}

impl KeyRecord {
    /// Build a record from deriver output, at the initial status
    pub fn from_derived(coin: Coin, account: AccountRole, key: &DerivedKey) -> Self {
        Self {
            coin,
            account,
            index: key.index,
            wif: key.wif.clone(),
            p2pkh_address: key.p2pkh_address.clone(),
            p2sh_segwit_address: key.p2sh_segwit_address.clone(),
            bech32_address: key.bech32_address.clone(),
            full_public_key: key.full_public_key.clone(),
            multisig_address: None,
            redeem_script: None,
            status: KeyStatus::HdKeyGenerated,
            updated_at: Utc::now(),
        }
    }

    /// Advance the status, refusing backwards or same-state moves
    pub fn advance(&mut self, next: KeyStatus) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }
}
