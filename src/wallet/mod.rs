//! Wallet role facades
//!
//! Each cold-wallet process runs as one role with an explicit set of
//! capabilities. The keygen wallet owns the customer-facing accounts
//! and composes multisig addresses; a sign wallet owns one
//! authorization key and co-signs. Neither role ever has a network
//! capability; every cross-machine interaction is a file.

use crate::coin::{AccountRole, Coin, Network};
use crate::exchange::{address_export_body, ExchangeError, PubkeyExchange};
use crate::hdkey::KeyDeriver;
use crate::ledger::{ImportSummary, KeyLedger, KeyRecordRepository, PrivKeyImporter};
use crate::multisig::{ComposedMultisig, MultisigComposer, ParticipantSet};
use crate::seed::{Seed, SeedManager};
use crate::signing::{SigningCoordinator, SigningReport};
use crate::storage::{FileStore, JsonWalletRepository, StorageConfig};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by wallet facade operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Seed error: {0}")]
    Seed(#[from] crate::seed::SeedError),
    #[error("No seed stored; run seed generation first")]
    NoSeed,
    #[error("Derivation error: {0}")]
    HdKey(#[from] crate::hdkey::HdKeyError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] crate::ledger::LedgerError),
    #[error("Multisig error: {0}")]
    Multisig(#[from] crate::multisig::MultisigError),
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("Signing error: {0}")]
    Signing(#[from] crate::signing::SigningError),
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// The key-generating cold wallet
///
/// Owns the client, deposit, and payment accounts; derives their keys,
/// feeds them to the node wallet, exports addresses and pubkeys, and
/// composes multisig addresses once authorization keys arrive.
pub struct KeygenWallet {
    coin: Coin,
    network: Network,
    seeds: SeedManager<JsonWalletRepository>,
    ledger: KeyLedger<JsonWalletRepository>,
    deriver: KeyDeriver,
    composer: MultisigComposer,
    exchange: PubkeyExchange,
    files: FileStore,
    repository: JsonWalletRepository,
}

impl KeygenWallet {
    pub fn new(
        coin: Coin,
        network: Network,
        storage: &StorageConfig,
        participants: ParticipantSet,
    ) -> Result<Self, WalletError> {
        let repository = JsonWalletRepository::new(storage)?;
        Ok(Self {
            coin,
            network,
            seeds: SeedManager::new(coin, repository.clone()),
            ledger: KeyLedger::new(coin, repository.clone()),
            deriver: KeyDeriver::new(coin, network),
            composer: MultisigComposer::new(participants, coin, network),
            exchange: PubkeyExchange::new(coin),
            files: FileStore::new(storage.data_dir.join("artifacts"))?,
            repository,
        })
    }

    /// Generate the master seed, or keep the existing one
    pub fn ensure_seed(&mut self) -> Result<Seed, WalletError> {
        Ok(self.seeds.generate()?)
    }

    /// Store operator-supplied seed material
    pub fn store_seed(&mut self, encoded: &str) -> Result<Seed, WalletError> {
        Ok(self.seeds.store(encoded)?)
    }

    /// Recover the seed from a BIP39 mnemonic phrase
    pub fn recover_seed(&mut self, phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
        Ok(self.seeds.recover(phrase, passphrase)?)
    }

    pub fn seed(&self) -> Result<Option<Seed>, WalletError> {
        Ok(self.seeds.retrieve()?)
    }

    /// Derive and register `count` fresh keys for an account
    ///
    /// Continues from the highest index already stored, so repeated
    /// calls extend the key space without gaps or reuse.
    pub fn derive_keys(&mut self, account: AccountRole, count: u32) -> Result<usize, WalletError> {
        let seed = self.seeds.retrieve()?.ok_or(WalletError::NoSeed)?;
        let idx_from = self.ledger.next_index(account)?;
        let keys = self.deriver.derive_batch(&seed, account, idx_from, count)?;
        Ok(self.ledger.register_batch(account, &keys)?)
    }

    /// Import pending private keys into the node wallet
    pub fn import_keys(
        &mut self,
        account: AccountRole,
        importer: &mut impl PrivKeyImporter,
    ) -> Result<ImportSummary, WalletError> {
        Ok(self.ledger.import_unimported(account, importer)?)
    }

    /// Export imported keys' addresses for the watch wallet
    ///
    /// Returns the written file path, or `None` when no key is at the
    /// exportable stage.
    pub fn export_addresses(
        &mut self,
        account: AccountRole,
    ) -> Result<Option<PathBuf>, WalletError> {
        let records = self.ledger.exportable(account)?;
        if records.is_empty() {
            return Ok(None);
        }
        let file_name = format!("addresses_{}_{}", self.coin, account);
        let path = self.files.write(&file_name, &address_export_body(&records))?;
        let wifs: Vec<String> = records.iter().map(|r| r.wif.clone()).collect();
        self.ledger.mark_exported(account, &wifs)?;
        Ok(Some(path))
    }

    /// Export this wallet's full public keys for an account
    pub fn export_pubkeys(&mut self, account: AccountRole) -> Result<Option<PathBuf>, WalletError> {
        let pubkeys = self
            .composer
            .eligible_keys(self.ledger.repository(), account)?;
        if pubkeys.is_empty() {
            return Ok(None);
        }
        let file_name = format!("pubkeys_{}_{}", self.coin, account);
        let body = self.exchange.export(account, &pubkeys);
        Ok(Some(self.files.write(&file_name, &body)?))
    }

    /// Compose the multisig address for an account from an imported
    /// pubkey file plus this wallet's own eligible keys
    pub fn compose_multisig(
        &mut self,
        account: AccountRole,
        pubkey_file: &Path,
    ) -> Result<ComposedMultisig, WalletError> {
        let own = self
            .composer
            .eligible_keys(self.ledger.repository(), account)?;
        let known: HashSet<String> = own.iter().cloned().collect();

        let content = self.files.read(pubkey_file)?;
        let imported = self.exchange.import(&content, &known)?;

        let mut pubkeys = own;
        pubkeys.extend(
            imported
                .into_iter()
                .filter(|e| e.role == account)
                .map(|e| e.full_public_key),
        );

        let composed = self.composer.compose(account, &pubkeys)?;
        self.composer
            .attach(self.ledger.repository_mut(), &composed)?;
        Ok(composed)
    }

    /// Apply this wallet's signatures to an unsigned artifact file
    pub fn sign_artifact(&mut self, path: &Path) -> Result<SigningReport, WalletError> {
        let mut coordinator =
            SigningCoordinator::new(&mut self.repository, &self.files, self.coin, self.network);
        Ok(coordinator.sign_artifact_file(path)?)
    }

    pub fn artifact_store(&self) -> &FileStore {
        &self.files
    }
}

/// An authorization co-signing cold wallet
///
/// Holds exactly one account's keys. It exports its full public key to
/// the keygen wallet and co-signs artifacts; it never composes
/// addresses or talks to a node.
pub struct SignWallet {
    coin: Coin,
    network: Network,
    seeds: SeedManager<JsonWalletRepository>,
    ledger: KeyLedger<JsonWalletRepository>,
    deriver: KeyDeriver,
    exchange: PubkeyExchange,
    files: FileStore,
    repository: JsonWalletRepository,
}

impl SignWallet {
    pub fn new(
        coin: Coin,
        network: Network,
        storage: &StorageConfig,
    ) -> Result<Self, WalletError> {
        let repository = JsonWalletRepository::new(storage)?;
        Ok(Self {
            coin,
            network,
            seeds: SeedManager::new(coin, repository.clone()),
            ledger: KeyLedger::new(coin, repository.clone()),
            deriver: KeyDeriver::new(coin, network),
            exchange: PubkeyExchange::new(coin),
            files: FileStore::new(storage.data_dir.join("artifacts"))?,
            repository,
        })
    }

    pub fn ensure_seed(&mut self) -> Result<Seed, WalletError> {
        Ok(self.seeds.generate()?)
    }

    pub fn store_seed(&mut self, encoded: &str) -> Result<Seed, WalletError> {
        Ok(self.seeds.store(encoded)?)
    }

    /// Recover the seed from a BIP39 mnemonic phrase
    pub fn recover_seed(&mut self, phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
        Ok(self.seeds.recover(phrase, passphrase)?)
    }

    /// Derive this signer's authorization key(s)
    pub fn generate_auth_keys(&mut self, count: u32) -> Result<usize, WalletError> {
        let seed = self.seeds.retrieve()?.ok_or(WalletError::NoSeed)?;
        let account = AccountRole::Authorization;
        let idx_from = self.ledger.next_index(account)?;
        let keys = self.deriver.derive_batch(&seed, account, idx_from, count)?;
        Ok(self.ledger.register_batch(account, &keys)?)
    }

    /// Export the authorization public key(s), tagged with the account
    /// they will co-sign for
    pub fn export_pubkeys(&mut self, target: AccountRole) -> Result<Option<PathBuf>, WalletError> {
        let pubkeys = self.auth_pubkeys()?;
        if pubkeys.is_empty() {
            return Ok(None);
        }
        let file_name = format!("pubkeys_{}_{}", self.coin, target);
        let body = self.exchange.export(target, &pubkeys);
        Ok(Some(self.files.write(&file_name, &body)?))
    }

    /// Apply this signer's signatures to an unsigned artifact file
    pub fn sign_artifact(&mut self, path: &Path) -> Result<SigningReport, WalletError> {
        let mut coordinator =
            SigningCoordinator::new(&mut self.repository, &self.files, self.coin, self.network);
        Ok(coordinator.sign_artifact_file(path)?)
    }

    pub fn artifact_store(&self) -> &FileStore {
        &self.files
    }

    fn auth_pubkeys(&self) -> Result<Vec<String>, WalletError> {
        use crate::ledger::KeyStatus;
        let mut pubkeys = Vec::new();
        for status in [
            KeyStatus::HdKeyGenerated,
            KeyStatus::PrivKeyImported,
            KeyStatus::AddressExported,
            KeyStatus::MultisigAddressGenerated,
        ] {
            for record in self
                .ledger
                .repository()
                .get_all_by_status(AccountRole::Authorization, status)?
            {
                pubkeys.push(record.full_public_key);
            }
        }
        Ok(pubkeys)
    }
}
