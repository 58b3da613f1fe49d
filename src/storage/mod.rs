//! On-disk persistence
//!
//! Two stores back a wallet process: a single JSON wallet database
//! (seed, key records, transaction records) and a directory of artifact
//! files exchanged across the air gap. Writes go through a temporary
//! file and an atomic rename.

pub mod filestore;
pub mod repository;

pub use filestore::FileStore;
pub use repository::{JsonWalletRepository, StorageConfig, WalletDb};

use std::io;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
