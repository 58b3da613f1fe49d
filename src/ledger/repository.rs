//! Persistence and node-wallet collaborator traits for the key ledger
//!
//! Implemented by external components (a relational store, a node RPC
//! client); the ledger only depends on these interfaces.

use crate::coin::AccountRole;
use crate::ledger::record::{KeyRecord, KeyStatus};
use thiserror::Error;

/// Ledger-level errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Repository operation '{op}' failed: {message}")]
    Repository { op: &'static str, message: String },
    #[error("No key found for account {0}")]
    NoKeyForAccount(AccountRole),
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: KeyStatus, to: KeyStatus },
}

/// Persistence collaborator for key records
///
/// Bulk status updates are keyed by the WIF export string, which is
/// unique per key, so retried updates are at-least-once safe.
pub trait KeyRecordRepository {
    /// Highest derivation index stored for an account, if any
    fn get_max_index(&self, account: AccountRole) -> Result<Option<u32>, LedgerError>;

    /// All records at exactly the given status
    fn get_all_by_status(
        &self,
        account: AccountRole,
        status: KeyStatus,
    ) -> Result<Vec<KeyRecord>, LedgerError>;

    /// All records whose multisig address is one of `addrs`
    fn get_all_by_multisig_addrs(
        &self,
        account: AccountRole,
        addrs: &[String],
    ) -> Result<Vec<KeyRecord>, LedgerError>;

    /// Insert a freshly derived batch
    fn insert_bulk(&mut self, records: Vec<KeyRecord>) -> Result<(), LedgerError>;

    /// Bulk status transition, keyed by WIF
    fn update_status_by_wif(
        &mut self,
        account: AccountRole,
        status: KeyStatus,
        wifs: &[String],
    ) -> Result<usize, LedgerError>;

    /// Attach multisig address and redeem script to matching records
    /// (grouping key: full public key) and advance their status
    ///
    /// Updates run record-by-record without an enclosing transaction; a
    /// crash mid-loop is repaired by re-running composition, which is
    /// deterministic and keyed by public key.
    fn update_multisig_fields(
        &mut self,
        account: AccountRole,
        pubkeys: &[String],
        multisig_address: &str,
        redeem_script: &str,
    ) -> Result<usize, LedgerError>;
}

/// Node-wallet collaborator that registers private keys for watching
pub trait PrivKeyImporter {
    /// Import a private key without triggering a chain rescan
    fn import_priv_key_without_rescan(&mut self, wif: &str, label: &str)
        -> Result<(), String>;
}
