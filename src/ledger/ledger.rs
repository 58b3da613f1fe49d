//! Key lifecycle pipeline over an injected repository
//!
//! Each operation selects its input keys by exact status match and
//! advances only the keys it fully processed, so every stage is
//! independently retryable.

use crate::coin::{AccountRole, Coin};
use crate::hdkey::DerivedKey;
use crate::ledger::record::{KeyRecord, KeyStatus};
use crate::ledger::repository::{KeyRecordRepository, LedgerError, PrivKeyImporter};

/// Outcome of one private-key import pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
}

impl ImportSummary {
    /// True when there was nothing left to import — a normal condition,
    /// not an error
    pub fn nothing_to_do(&self) -> bool {
        self.imported == 0 && self.failed == 0
    }
}

/// Tracks derived keys through their lifecycle
pub struct KeyLedger<R: KeyRecordRepository> {
    coin: Coin,
    repository: R,
}

impl<R: KeyRecordRepository> KeyLedger<R> {
    pub fn new(coin: Coin, repository: R) -> Self {
        Self { coin, repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    /// Next unused derivation index for an account
    pub fn next_index(&self, account: AccountRole) -> Result<u32, LedgerError> {
        Ok(match self.repository.get_max_index(account)? {
            Some(max) => max + 1,
            None => 0,
        })
    }

    /// Persist a freshly derived batch at `HdKeyGenerated`
    pub fn register_batch(
        &mut self,
        account: AccountRole,
        keys: &[DerivedKey],
    ) -> Result<usize, LedgerError> {
        let records: Vec<KeyRecord> = keys
            .iter()
            .map(|k| KeyRecord::from_derived(self.coin, account, k))
            .collect();
        let count = records.len();
        self.repository.insert_bulk(records)?;
        Ok(count)
    }

    /// Import every key still at `HdKeyGenerated` into the node wallet
    ///
    /// A failed import is logged and skipped; the key stays at
    /// `HdKeyGenerated` and is retried on the next invocation. Only the
    /// successfully imported keys advance.
    pub fn import_unimported(
        &mut self,
        account: AccountRole,
        importer: &mut impl PrivKeyImporter,
    ) -> Result<ImportSummary, LedgerError> {
        let pending = self
            .repository
            .get_all_by_status(account, KeyStatus::HdKeyGenerated)?;

        let mut summary = ImportSummary::default();
        let mut imported_wifs = Vec::new();

        for record in &pending {
            let label = format!("{}_{}", account, record.index);
            match importer.import_priv_key_without_rescan(&record.wif, &label) {
                Ok(()) => {
                    imported_wifs.push(record.wif.clone());
                    summary.imported += 1;
                }
                Err(message) => {
                    log::warn!(
                        "private key import failed for {} index {}: {}",
                        account,
                        record.index,
                        message
                    );
                    summary.failed += 1;
                }
            }
        }

        if !imported_wifs.is_empty() {
            self.repository.update_status_by_wif(
                account,
                KeyStatus::PrivKeyImported,
                &imported_wifs,
            )?;
        }
        Ok(summary)
    }

    /// All keys ready for address export
    pub fn exportable(&self, account: AccountRole) -> Result<Vec<KeyRecord>, LedgerError> {
        self.repository
            .get_all_by_status(account, KeyStatus::PrivKeyImported)
    }

    /// Bulk-advance exported keys, keyed by WIF
    ///
    /// Called after the export file has been written; re-running after a
    /// partial failure re-exports only keys still at `PrivKeyImported`.
    pub fn mark_exported(
        &mut self,
        account: AccountRole,
        wifs: &[String],
    ) -> Result<usize, LedgerError> {
        self.repository
            .update_status_by_wif(account, KeyStatus::AddressExported, wifs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testutil::MemoryKeyRepository;

    struct FlakyImporter {
        fail_on: Vec<String>,
        imported: Vec<String>,
    }

    impl PrivKeyImporter for FlakyImporter {
        fn import_priv_key_without_rescan(
            &mut self,
            wif: &str,
            _label: &str,
        ) -> Result<(), String> {
            if self.fail_on.iter().any(|w| w == wif) {
                return Err("connection refused".to_string());
            }
            self.imported.push(wif.to_string());
            Ok(())
        }
    }

    fn derived(index: u32) -> DerivedKey {
        DerivedKey {
            index,
            wif: format!("wif-{}", index),
            p2pkh_address: format!("p2pkh-{}", index),
            p2sh_segwit_address: format!("p2sh-{}", index),
            witness_program_hex: "0014".to_string(),
            bech32_address: format!("bc1-{}", index),
            full_public_key: format!("02pub{}", index),
        }
    }

    fn ledger_with_keys(count: u32) -> KeyLedger<MemoryKeyRepository> {
        let mut ledger = KeyLedger::new(Coin::Bitcoin, MemoryKeyRepository::default());
        let keys: Vec<DerivedKey> = (0..count).map(derived).collect();
        ledger.register_batch(AccountRole::Client, &keys).unwrap();
        ledger
    }

    #[test]
    fn test_next_index() {
        let ledger = ledger_with_keys(3);
        assert_eq!(ledger.next_index(AccountRole::Client).unwrap(), 3);
        assert_eq!(ledger.next_index(AccountRole::Deposit).unwrap(), 0);
    }

    #[test]
    fn test_import_advances_only_successes() {
        let mut ledger = ledger_with_keys(3);
        let mut importer = FlakyImporter {
            fail_on: vec!["wif-1".to_string()],
            imported: vec![],
        };

        let summary = ledger
            .import_unimported(AccountRole::Client, &mut importer)
            .unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.failed, 1);

        // The failed key is still selectable for retry
        let remaining = ledger
            .repository()
            .get_all_by_status(AccountRole::Client, KeyStatus::HdKeyGenerated)
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].wif, "wif-1");

        // Retry picks up exactly the failed key
        let mut importer = FlakyImporter {
            fail_on: vec![],
            imported: vec![],
        };
        let summary = ledger
            .import_unimported(AccountRole::Client, &mut importer)
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(importer.imported, vec!["wif-1".to_string()]);
    }

    #[test]
    fn test_import_with_nothing_pending() {
        let mut ledger = KeyLedger::new(Coin::Bitcoin, MemoryKeyRepository::default());
        let mut importer = FlakyImporter {
            fail_on: vec![],
            imported: vec![],
        };
        let summary = ledger
            .import_unimported(AccountRole::Client, &mut importer)
            .unwrap();
        assert!(summary.nothing_to_do());
    }

    #[test]
    fn test_export_pipeline() {
        let mut ledger = ledger_with_keys(2);
        let mut importer = FlakyImporter {
            fail_on: vec![],
            imported: vec![],
        };
        ledger
            .import_unimported(AccountRole::Client, &mut importer)
            .unwrap();

        let exportable = ledger.exportable(AccountRole::Client).unwrap();
        assert_eq!(exportable.len(), 2);

        let wifs: Vec<String> = exportable.iter().map(|r| r.wif.clone()).collect();
        let updated = ledger.mark_exported(AccountRole::Client, &wifs).unwrap();
        assert_eq!(updated, 2);

        // Exported keys are never selected by an earlier-stage filter again
        assert!(ledger.exportable(AccountRole::Client).unwrap().is_empty());
        assert!(ledger
            .repository()
            .get_all_by_status(AccountRole::Client, KeyStatus::HdKeyGenerated)
            .unwrap()
            .is_empty());
    }
}
