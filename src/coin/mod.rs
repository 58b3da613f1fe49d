//! Coin, network, and account role model
//!
//! Every supported coin is a variant of a closed enum; coin-specific
//! behavior is selected by matching here, never by open type dispatch.

pub mod cashaddr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported coins
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Coin {
    #[serde(rename = "btc")]
    #[value(name = "btc")]
    Bitcoin,
    #[serde(rename = "bch")]
    #[value(name = "bch")]
    BitcoinCash,
}

impl Coin {
    /// BIP44 coin type constant (hardened at derivation time)
    pub fn coin_type(&self) -> u32 {
        match self {
            Coin::Bitcoin => 0,
            Coin::BitcoinCash => 145,
        }
    }

    /// Short symbol used in export files and database names
    pub fn symbol(&self) -> &'static str {
        match self {
            Coin::Bitcoin => "btc",
            Coin::BitcoinCash => "bch",
        }
    }

    /// Address/WIF encoding parameters for a network
    pub fn network_params(&self, network: Network) -> NetworkParams {
        match network {
            Network::Mainnet => NetworkParams {
                p2pkh_version: 0x00,
                p2sh_version: 0x05,
                wif_version: 0x80,
                bech32_hrp: "bc",
                cashaddr_prefix: match self {
                    Coin::BitcoinCash => Some("bitcoincash"),
                    _ => None,
                },
            },
            Network::Testnet => NetworkParams {
                p2pkh_version: 0x6f,
                p2sh_version: 0xc4,
                wif_version: 0xef,
                bech32_hrp: "tb",
                cashaddr_prefix: match self {
                    Coin::BitcoinCash => Some("bchtest"),
                    _ => None,
                },
            },
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Coin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "btc" => Ok(Coin::Bitcoin),
            "bch" => Ok(Coin::BitcoinCash),
            other => Err(format!("unknown coin: {}", other)),
        }
    }
}

/// Network selection
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

/// Version bytes and prefixes for one coin/network combination
#[derive(Clone, Copy, Debug)]
pub struct NetworkParams {
    pub p2pkh_version: u8,
    pub p2sh_version: u8,
    pub wif_version: u8,
    pub bech32_hrp: &'static str,
    /// Set only for coins whose canonical address format is cashaddr
    pub cashaddr_prefix: Option<&'static str>,
}

/// Logical account roles within a wallet
///
/// Each role maps to a fixed hardened BIP44 account index, so the same
/// seed always reproduces the same tree per role.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Customer-facing receive addresses (non-multisig)
    Client,
    /// Pooled deposit account (multisig)
    Deposit,
    /// Outgoing payment account (multisig)
    Payment,
    /// Authorization keys held by a signer wallet (non-multisig themselves,
    /// they co-sign deposit/payment spends)
    Authorization,
}

impl AccountRole {
    /// Hardened BIP44 account index for this role
    pub fn account_index(&self) -> u32 {
        match self {
            AccountRole::Client => 0,
            AccountRole::Deposit => 1,
            AccountRole::Payment => 2,
            AccountRole::Authorization => 3,
        }
    }

    /// Whether spends from this account require M-of-N signatures
    pub fn requires_multisig(&self) -> bool {
        matches!(self, AccountRole::Deposit | AccountRole::Payment)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Client => "client",
            AccountRole::Deposit => "deposit",
            AccountRole::Payment => "payment",
            AccountRole::Authorization => "authorization",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(AccountRole::Client),
            "deposit" => Ok(AccountRole::Deposit),
            "payment" => Ok(AccountRole::Payment),
            "authorization" => Ok(AccountRole::Authorization),
            other => Err(format!("unknown account role: {}", other)),
        }
    }
}

/// Physical wallet roles in the segmented custody setup
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WalletRole {
    /// Cold wallet that generates client/deposit/payment keys
    Keygen,
    /// Cold wallet holding authorization keys, co-signs multisig spends
    Sign,
    /// Network-facing watch-only wallet
    Watch,
}

impl WalletRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletRole::Keygen => "keygen",
            WalletRole::Sign => "sign",
            WalletRole::Watch => "watch",
        }
    }
}

impl fmt::Display for WalletRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
