//! JSON wallet database
//!
//! A cold wallet has no database server; everything it tracks lives in
//! one pretty-printed JSON file. The repository loads, mutates, and
//! rewrites the whole file per operation, which is plenty for an
//! air-gapped machine and keeps the file inspectable by an operator.

use crate::coin::AccountRole;
use crate::ledger::{
    KeyRecord, KeyRecordRepository, KeyStatus, LedgerError, TxRecord, TxRecordRepository,
};
use crate::seed::{SeedError, SeedRepository, StoredSeed};
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

/// Wallet database configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub wallet_file: String,
    /// Log every load and save at debug level
    pub trace_io: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".wallet_data"),
            wallet_file: "wallet.json".to_string(),
            trace_io: false,
        }
    }
}

/// Everything one wallet process persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletDb {
    pub seed: Option<StoredSeed>,
    pub keys: Vec<KeyRecord>,
    pub txs: Vec<TxRecord>,
}

/// File-backed repository implementing all persistence traits
///
/// Load-mutate-save per operation; the save goes through a temporary
/// file and an atomic rename so a crash never truncates the database.
#[derive(Clone)]
pub struct JsonWalletRepository {
    path: PathBuf,
    temp_path: PathBuf,
    trace_io: bool,
}

impl JsonWalletRepository {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            path: config.data_dir.join(&config.wallet_file),
            temp_path: config.data_dir.join(format!("{}.tmp", config.wallet_file)),
            trace_io: config.trace_io,
        })
    }

    /// Load the database, or an empty one if the file does not exist yet
    pub fn load(&self) -> Result<WalletDb, StorageError> {
        if !self.path.exists() {
            return Ok(WalletDb::default());
        }
        if self.trace_io {
            log::debug!("loading {}", self.path.display());
        }
        let file = fs::File::open(&self.path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, db: &WalletDb) -> Result<(), StorageError> {
        if self.trace_io {
            log::debug!(
                "saving {} ({} keys, {} txs)",
                self.path.display(),
                db.keys.len(),
                db.txs.len()
            );
        }
        let file = fs::File::create(&self.temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, db)?;
        fs::rename(&self.temp_path, &self.path)?;
        Ok(())
    }

    fn mutate<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut WalletDb) -> T,
    ) -> Result<T, LedgerError> {
        let mut db = self.load().map_err(|e| LedgerError::Repository {
            op,
            message: e.to_string(),
        })?;
        let out = f(&mut db);
        self.save(&db).map_err(|e| LedgerError::Repository {
            op,
            message: e.to_string(),
        })?;
        Ok(out)
    }

    fn view<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&WalletDb) -> T,
    ) -> Result<T, LedgerError> {
        let db = self.load().map_err(|e| LedgerError::Repository {
            op,
            message: e.to_string(),
        })?;
        Ok(f(&db))
    }
}

impl SeedRepository for JsonWalletRepository {
    fn get_one(&self) -> Result<Option<StoredSeed>, SeedError> {
        let db = self.load().map_err(|e| SeedError::Repository {
            op: "seed_get",
            message: e.to_string(),
        })?;
        Ok(db.seed)
    }

    fn insert(&mut self, seed: StoredSeed) -> Result<(), SeedError> {
        let mut db = self.load().map_err(|e| SeedError::Repository {
            op: "seed_insert",
            message: e.to_string(),
        })?;
        if db.seed.is_some() {
            return Err(SeedError::Repository {
                op: "seed_insert",
                message: "a seed already exists".to_string(),
            });
        }
        db.seed = Some(seed);
        self.save(&db).map_err(|e| SeedError::Repository {
            op: "seed_insert",
            message: e.to_string(),
        })
    }
}

impl KeyRecordRepository for JsonWalletRepository {
    fn get_max_index(&self, account: AccountRole) -> Result<Option<u32>, LedgerError> {
        self.view("key_max_index", |db| {
            db.keys
                .iter()
                .filter(|r| r.account == account)
                .map(|r| r.index)
                .max()
        })
    }

    fn get_all_by_status(
        &self,
        account: AccountRole,
        status: KeyStatus,
    ) -> Result<Vec<KeyRecord>, LedgerError> {
        self.view("key_by_status", |db| {
            let mut records: Vec<KeyRecord> = db
                .keys
                .iter()
                .filter(|r| r.account == account && r.status == status)
                .cloned()
                .collect();
            records.sort_by_key(|r| r.index);
            records
        })
    }

    fn get_all_by_multisig_addrs(
        &self,
        account: AccountRole,
        addrs: &[String],
    ) -> Result<Vec<KeyRecord>, LedgerError> {
        self.view("key_by_multisig", |db| {
            db.keys
                .iter()
                .filter(|r| {
                    r.account == account
                        && r.multisig_address
                            .as_ref()
                            .map(|a| addrs.contains(a))
                            .unwrap_or(false)
                })
                .cloned()
                .collect()
        })
    }

    fn insert_bulk(&mut self, records: Vec<KeyRecord>) -> Result<(), LedgerError> {
        self.mutate("key_insert_bulk", |db| db.keys.extend(records))
    }

    fn update_status_by_wif(
        &mut self,
        account: AccountRole,
        status: KeyStatus,
        wifs: &[String],
    ) -> Result<usize, LedgerError> {
        self.mutate("key_update_status", |db| {
            let mut updated = 0;
            for record in db
                .keys
                .iter_mut()
                .filter(|r| r.account == account && wifs.contains(&r.wif))
            {
                if record.advance(status) {
                    updated += 1;
                }
            }
            updated
        })
    }

    fn update_multisig_fields(
        &mut self,
        account: AccountRole,
        pubkeys: &[String],
        multisig_address: &str,
        redeem_script: &str,
    ) -> Result<usize, LedgerError> {
        self.mutate("key_update_multisig", |db| {
            let mut updated = 0;
            for record in db
                .keys
                .iter_mut()
                .filter(|r| r.account == account && pubkeys.contains(&r.full_public_key))
            {
                record.multisig_address = Some(multisig_address.to_string());
                record.redeem_script = Some(redeem_script.to_string());
                record.advance(KeyStatus::MultisigAddressGenerated);
                updated += 1;
            }
            updated
        })
    }
}

impl TxRecordRepository for JsonWalletRepository {
    fn get_one(&self, tx_id: u64) -> Result<Option<TxRecord>, LedgerError> {
        self.view("tx_get", |db| {
            db.txs.iter().find(|r| r.tx_id == tx_id).cloned()
        })
    }

    fn insert(&mut self, record: TxRecord) -> Result<(), LedgerError> {
        self.mutate("tx_insert", |db| db.txs.push(record))
    }

    fn update(&mut self, record: TxRecord) -> Result<(), LedgerError> {
        self.mutate("tx_update", |db| {
            match db.txs.iter_mut().find(|r| r.tx_id == record.tx_id) {
                Some(existing) => {
                    *existing = record;
                    Ok(())
                }
                None => Err(LedgerError::Repository {
                    op: "tx_update",
                    message: format!("tx {} not found", record.tx_id),
                }),
            }
        })?
    }

    fn next_id(&self) -> Result<u64, LedgerError> {
        self.view("tx_next_id", |db| {
            db.txs.iter().map(|r| r.tx_id).max().unwrap_or(0) + 1
        })
    }
}
