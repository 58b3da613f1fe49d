//! Multisignature redeem-script composition
//!
//! Combines full public keys contributed by independent wallet roles
//! into an M-of-N redeem script and its P2SH address.

pub mod composer;
pub mod script;

pub use composer::{ComposedMultisig, MultisigComposer, MultisigPolicy, ParticipantSet};
pub use script::RedeemScript;

use crate::coin::AccountRole;
use crate::ledger::LedgerError;
use thiserror::Error;

/// Errors related to multisig composition
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Incomplete participants: have {have}, need {need}")]
    IncompleteParticipants { have: usize, need: usize },
    #[error("Duplicate participant public key")]
    DuplicateParticipant,
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("No multisig policy for account {0}")]
    NoPolicy(AccountRole),
    #[error("Malformed redeem script: {0}")]
    MalformedScript(String),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
