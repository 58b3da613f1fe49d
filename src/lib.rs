//! Segmented cold-wallet key management and signing
//!
//! This crate implements the offline half of a segmented custody setup:
//! - BIP32/BIP44 key derivation from a per-coin master seed
//! - A forward-only key lifecycle ledger over injected repositories
//! - M-of-N redeem-script composition from independently contributed keys
//! - An air-gapped, file-based multi-pass signing protocol
//!
//! Keys for Bitcoin and Bitcoin Cash are derived, tracked, and used to
//! sign without any network capability; files are the only interface
//! between wallet roles.
//!
//! # Example
//!
//! ```rust
//! use coldvault::coin::{AccountRole, Coin, Network};
//! use coldvault::hdkey::KeyDeriver;
//! use coldvault::seed::Seed;
//!
//! let seed = Seed::from_bytes(Coin::Bitcoin, vec![7u8; 64]).unwrap();
//! let deriver = KeyDeriver::new(Coin::Bitcoin, Network::Mainnet);
//!
//! let keys = deriver
//!     .derive_batch(&seed, AccountRole::Client, 0, 2)
//!     .unwrap();
//! println!("first receive address: {}", keys[0].p2pkh_address);
//!
//! // Derivation is deterministic: the same seed always yields the same keys
//! let again = deriver
//!     .derive_batch(&seed, AccountRole::Client, 0, 2)
//!     .unwrap();
//! assert_eq!(keys[0].wif, again[0].wif);
//! ```

pub mod cli;
pub mod coin;
pub mod crypto;
pub mod exchange;
pub mod hdkey;
pub mod ledger;
pub mod multisig;
pub mod seed;
pub mod signing;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use coin::{AccountRole, Coin, Network, WalletRole};
pub use exchange::{PubkeyEntry, PubkeyExchange};
pub use hdkey::{DerivedKey, KeyDeriver};
pub use ledger::{KeyLedger, KeyRecord, KeyStatus, TxRecord, TxType};
pub use multisig::{ComposedMultisig, MultisigComposer, ParticipantSet, RedeemScript};
pub use seed::{Seed, SeedManager};
pub use signing::{RawTransaction, SigningCoordinator, SigningReport};
pub use storage::{FileStore, JsonWalletRepository, StorageConfig};
pub use wallet::{KeygenWallet, SignWallet};
