//! Key and transaction ledger
//!
//! Tracks each derived key's lifecycle status and each transaction's
//! bookkeeping row through injected repository collaborators.

#[allow(clippy::module_inception)]
pub mod ledger;
pub mod record;
pub mod repository;
pub mod txrecord;

pub use ledger::{ImportSummary, KeyLedger};
pub use record::{KeyRecord, KeyStatus};
pub use repository::{KeyRecordRepository, LedgerError, PrivKeyImporter};
pub use txrecord::{TxRecord, TxRecordRepository, TxType};

#[cfg(test)]
pub(crate) mod testutil {
    //! In-memory repositories shared by unit tests

    use super::*;
    use crate::coin::AccountRole;

    #[derive(Default)]
    pub struct MemoryKeyRepository {
        pub records: Vec<KeyRecord>,
    }

    impl KeyRecordRepository for MemoryKeyRepository {
        fn get_max_index(&self, account: AccountRole) -> Result<Option<u32>, LedgerError> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.account == account)
                .map(|r| r.index)
                .max())
        }

        fn get_all_by_status(
            &self,
            account: AccountRole,
            status: KeyStatus,
        ) -> Result<Vec<KeyRecord>, LedgerError> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.account == account && r.status == status)
                .cloned()
                .collect())
        }

        fn get_all_by_multisig_addrs(
            &self,
            account: AccountRole,
            addrs: &[String],
        ) -> Result<Vec<KeyRecord>, LedgerError> {
            Ok(self
                .records
                .iter()
                .filter(|r| {
                    r.account == account
                        && r.multisig_address
                            .as_ref()
                            .map(|a| addrs.contains(a))
                            .unwrap_or(false)
                })
                .cloned()
                .collect())
        }

        fn insert_bulk(&mut self, records: Vec<KeyRecord>) -> Result<(), LedgerError> {
            self.records.extend(records);
            Ok(())
        }

        fn update_status_by_wif(
            &mut self,
            account: AccountRole,
            status: KeyStatus,
            wifs: &[String],
        ) -> Result<usize, LedgerError> {
            let mut updated = 0;
            for record in self
                .records
                .iter_mut()
                .filter(|r| r.account == account && wifs.contains(&r.wif))
            {
                if record.advance(status) {
                    updated += 1;
                }
            }
            Ok(updated)
        }

        fn update_multisig_fields(
            &mut self,
            account: AccountRole,
            pubkeys: &[String],
            multisig_address: &str,
            redeem_script: &str,
        ) -> Result<usize, LedgerError> {
            let mut updated = 0;
            for record in self
                .records
                .iter_mut()
                .filter(|r| r.account == account && pubkeys.contains(&r.full_public_key))
            {
                record.multisig_address = Some(multisig_address.to_string());
                record.redeem_script = Some(redeem_script.to_string());
                record.advance(KeyStatus::MultisigAddressGenerated);
                updated += 1;
            }
            Ok(updated)
        }
    }

    #[derive(Default)]
    pub struct MemoryTxRepository {
        pub records: Vec<TxRecord>,
    }

    impl TxRecordRepository for MemoryTxRepository {
        fn get_one(&self, tx_id: u64) -> Result<Option<TxRecord>, LedgerError> {
            Ok(self.records.iter().find(|r| r.tx_id == tx_id).cloned())
        }

        fn insert(&mut self, record: TxRecord) -> Result<(), LedgerError> {
            self.records.push(record);
            Ok(())
        }

        fn update(&mut self, record: TxRecord) -> Result<(), LedgerError> {
            match self.records.iter_mut().find(|r| r.tx_id == record.tx_id) {
                Some(existing) => {
                    *existing = record;
                    Ok(())
                }
                None => Err(LedgerError::Repository {
                    op: "tx_update",
                    message: format!("tx {} not found", record.tx_id),
                }),
            }
        }

        fn next_id(&self) -> Result<u64, LedgerError> {
            Ok(self.records.iter().map(|r| r.tx_id).max().unwrap_or(0) + 1)
        }
    }
}
