//! Air-gapped transaction signing
//!
//! An unsigned transaction artifact travels as a file between isolated
//! signer processes. Each signer contributes only its own signatures;
//! the artifact converges to fully signed once the script threshold is
//! met on every input. A partial signature is an expected non-terminal
//! outcome, distinguished from failure on every API surface.

pub mod artifact;
pub mod coordinator;
pub mod signer;
pub mod transaction;

pub use artifact::{Artifact, ArtifactName, PrevTxBundle, TxAction, TxStage};
pub use coordinator::{SigningCoordinator, SigningReport};
pub use signer::{sign_transaction, SignOutcome};
pub use transaction::{InputSignature, PrevOutput, RawTransaction, TxInput, TxOutput};

use thiserror::Error;

/// Errors raised by the signing pipeline
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),
    #[error("Missing previous output for input {txid}:{vout}")]
    MissingPrevOutput { txid: String, vout: u32 },
    #[error("No signing key held for address {0}")]
    NoKeyForAddress(String),
    #[error("Signing key decode failed: {0}")]
    KeyDecode(String),
    #[error("Signature primitive failed: {0}")]
    Primitive(String),
    #[error("Multisig error: {0}")]
    Multisig(#[from] crate::multisig::MultisigError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] crate::ledger::LedgerError),
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}
