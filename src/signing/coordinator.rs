//! File-driven signing coordinator
//!
//! Drives one signing pass end to end: parse the artifact file, load
//! this role's keys from the ledger, sign, and write the successor
//! artifact. The coordinator never talks to a network; files are its
//! only interface to the rest of the pipeline.

use crate::coin::{AccountRole, Coin, Network};
use crate::hdkey::wif_decode;
use crate::ledger::{KeyRecord, KeyRecordRepository, KeyStatus, TxRecordRepository};
use crate::multisig::RedeemScript;
use crate::signing::artifact::{Artifact, ArtifactName, PrevTxBundle, TxStage};
use crate::signing::signer::sign_transaction;
use crate::signing::transaction::RawTransaction;
use crate::signing::SigningError;
use crate::storage::FileStore;
use secp256k1::SecretKey;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const ALL_STATUSES: [KeyStatus; 4] = [
    KeyStatus::HdKeyGenerated,
    KeyStatus::PrivKeyImported,
    KeyStatus::AddressExported,
    KeyStatus::MultisigAddressGenerated,
];

/// Outcome of one coordinator pass over an artifact file
#[derive(Debug)]
pub struct SigningReport {
    pub tx_id: u64,
    /// All inputs met their threshold
    pub is_signed: bool,
    /// Signing passes applied including this one
    pub signed_count: u8,
    /// The artifact written for the next pipeline stage
    pub output_path: PathBuf,
}

/// Runs signing passes for one wallet role
pub struct SigningCoordinator<'a, R> {
    repository: &'a mut R,
    files: &'a FileStore,
    coin: Coin,
    network: Network,
}

impl<'a, R> SigningCoordinator<'a, R>
where
    R: KeyRecordRepository + TxRecordRepository,
{
    pub fn new(
        repository: &'a mut R,
        files: &'a FileStore,
        coin: Coin,
        network: Network,
    ) -> Self {
        Self {
            repository,
            files,
            coin,
            network,
        }
    }

    /// Apply this role's signatures to an unsigned artifact file
    ///
    /// Writes `{action}_{id}_signed` when every input meets its
    /// threshold, otherwise `{action}_{id}_unsigned_{count+1}` for the
    /// next signer. Both outcomes are success; only malformed input or
    /// missing key material is an error.
    pub fn sign_artifact_file(&mut self, path: &Path) -> Result<SigningReport, SigningError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SigningError::MalformedArtifact("unreadable file name".to_string()))?;
        let name = ArtifactName::parse(file_name)?;
        if name.stage != TxStage::Unsigned {
            return Err(SigningError::MalformedArtifact(format!(
                "{} is already fully signed",
                file_name
            )));
        }

        let body = self.files.read(path)?;
        let artifact = Artifact::parse_body(&body)?;
        let bundle = artifact.bundle.ok_or_else(|| {
            SigningError::MalformedArtifact("unsigned artifact without metadata bundle".to_string())
        })?;
        let mut tx = RawTransaction::decode_hex(&artifact.tx_hex)?;

        let (records, redeem_script) = self.owned_records(&bundle, &tx)?;
        let keys = self.decode_keys(&records)?;
        if let Some(script) = &redeem_script {
            for input in &mut tx.inputs {
                if input.redeem_script.is_none() {
                    input.redeem_script = Some(script.clone());
                }
            }
        }

        let signed_count = name.signed_count.checked_add(1).ok_or_else(|| {
            SigningError::MalformedArtifact(format!(
                "{} has exhausted the signing pass counter",
                file_name
            ))
        })?;
        log::info!(
            "signing {} with {} key(s), pass {}",
            file_name,
            keys.len(),
            signed_count
        );
        let outcome = sign_transaction(&tx, &bundle.prev_outputs, &keys, self.coin, self.network)?;

        let report = if outcome.is_signed {
            let out_name = ArtifactName::signed(name.action, name.tx_id);
            let output_path = self.files.write(
                &out_name.to_file_name(),
                &Artifact {
                    tx_hex: outcome.hex.clone(),
                    bundle: None,
                }
                .to_body()?,
            )?;
            self.record_signed(name.tx_id, &outcome.hex)?;
            SigningReport {
                tx_id: name.tx_id,
                is_signed: true,
                signed_count,
                output_path,
            }
        } else {
            // Carry the resolved script forward so later signers need no
            // ledger lookup of their own.
            let next_bundle = PrevTxBundle {
                prev_outputs: bundle.prev_outputs.clone(),
                sender_account: bundle.sender_account,
                redeem_script: redeem_script.or(bundle.redeem_script),
            };
            let out_name = ArtifactName::unsigned(name.action, name.tx_id, signed_count);
            let output_path = self.files.write(
                &out_name.to_file_name(),
                &Artifact {
                    tx_hex: outcome.hex,
                    bundle: Some(next_bundle),
                }
                .to_body()?,
            )?;
            SigningReport {
                tx_id: name.tx_id,
                is_signed: false,
                signed_count,
                output_path,
            }
        };
        Ok(report)
    }

    /// Ledger records owning the spent outputs, plus the redeem script
    /// to satisfy them for a multisig spend
    ///
    /// The script is resolved from the bundle, the transaction inputs,
    /// or an owned record, in that order. A co-signing wallet that never
    /// saw the composition holds its key under the authorization
    /// account; when the multisig-address lookup finds nothing, keys are
    /// selected by membership in the redeem script instead.
    fn owned_records(
        &self,
        bundle: &PrevTxBundle,
        tx: &RawTransaction,
    ) -> Result<(Vec<KeyRecord>, Option<String>), SigningError> {
        let spent: HashSet<&String> = bundle.prev_outputs.iter().map(|p| &p.address).collect();

        if !bundle.sender_account.requires_multisig() {
            // Match any address encoding across the whole lifecycle
            let mut records = Vec::new();
            for status in ALL_STATUSES {
                for record in self
                    .repository
                    .get_all_by_status(bundle.sender_account, status)?
                {
                    if spent.contains(&record.p2pkh_address)
                        || spent.contains(&record.p2sh_segwit_address)
                        || spent.contains(&record.bech32_address)
                    {
                        records.push(record);
                    }
                }
            }
            return Ok((records, None));
        }

        let mut script = bundle
            .redeem_script
            .clone()
            .or_else(|| tx.inputs.iter().find_map(|i| i.redeem_script.clone()));

        let addrs: Vec<String> = spent.iter().map(|a| (*a).clone()).collect();
        let mut records = self
            .repository
            .get_all_by_multisig_addrs(bundle.sender_account, &addrs)?;

        if records.is_empty() {
            let script_hex = script.clone().ok_or_else(|| {
                SigningError::MalformedArtifact(
                    "no redeem script available for multisig input".to_string(),
                )
            })?;
            let script_keys = RedeemScript::from_hex(&script_hex)?.pubkeys();
            for status in ALL_STATUSES {
                for record in self
                    .repository
                    .get_all_by_status(AccountRole::Authorization, status)?
                {
                    if script_keys.contains(&record.full_public_key) {
                        records.push(record);
                    }
                }
            }
        } else if script.is_none() {
            script = records.iter().find_map(|r| r.redeem_script.clone());
        }

        let script = script.ok_or_else(|| {
            SigningError::MalformedArtifact(
                "no redeem script available for multisig input".to_string(),
            )
        })?;
        Ok((records, Some(script)))
    }

    /// Decode the WIF of every owned record; an undecodable key is fatal
    fn decode_keys(&self, records: &[KeyRecord]) -> Result<Vec<SecretKey>, SigningError> {
        let params = self.coin.network_params(self.network);
        records
            .iter()
            .map(|r| {
                wif_decode(&params, &r.wif)
                    .map_err(|e| SigningError::KeyDecode(format!("index {}: {}", r.index, e)))
            })
            .collect()
    }

    /// Mark the bookkeeping row signed, if one exists on this machine
    fn record_signed(&mut self, tx_id: u64, hex: &str) -> Result<(), SigningError> {
        match TxRecordRepository::get_one(self.repository, tx_id)? {
            Some(mut record) => {
                record.attach_signed_hex(hex.to_string())?;
                self.repository.update(record)?;
            }
            // Signer machines that never saw the unsigned build have no
            // row; the builder's machine keeps the canonical one.
            None => log::debug!("no bookkeeping row for tx {}", tx_id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::AccountRole;
    use crate::hdkey::KeyDeriver;
    use crate::ledger::testutil::{MemoryKeyRepository, MemoryTxRepository};
    use crate::ledger::{LedgerError, TxRecord};
    use crate::multisig::RedeemScript;
    use crate::seed::Seed;
    use crate::signing::artifact::TxAction;
    use crate::signing::transaction::{PrevOutput, TxOutput};

    /// Combined in-memory repository for coordinator tests
    #[derive(Default)]
    struct MemoryWallet {
        keys: MemoryKeyRepository,
        txs: MemoryTxRepository,
    }

    impl KeyRecordRepository for MemoryWallet {
        fn get_max_index(&self, account: AccountRole) -> Result<Option<u32>, LedgerError> {
            self.keys.get_max_index(account)
        }
        fn get_all_by_status(
            &self,
            account: AccountRole,
            status: KeyStatus,
        ) -> Result<Vec<KeyRecord>, LedgerError> {
            self.keys.get_all_by_status(account, status)
        }
        fn get_all_by_multisig_addrs(
            &self,
            account: AccountRole,
            addrs: &[String],
        ) -> Result<Vec<KeyRecord>, LedgerError> {
            self.keys.get_all_by_multisig_addrs(account, addrs)
        }
        fn insert_bulk(&mut self, records: Vec<KeyRecord>) -> Result<(), LedgerError> {
            self.keys.insert_bulk(records)
        }
        fn update_status_by_wif(
            &mut self,
            account: AccountRole,
            status: KeyStatus,
            wifs: &[String],
        ) -> Result<usize, LedgerError> {
            self.keys.update_status_by_wif(account, status, wifs)
        }
        fn update_multisig_fields(
            &mut self,
            account: AccountRole,
            pubkeys: &[String],
            multisig_address: &str,
            redeem_script: &str,
        ) -> Result<usize, LedgerError> {
            self.keys
                .update_multisig_fields(account, pubkeys, multisig_address, redeem_script)
        }
    }

    impl TxRecordRepository for MemoryWallet {
        fn get_one(&self, tx_id: u64) -> Result<Option<TxRecord>, LedgerError> {
            self.txs.get_one(tx_id)
        }
        fn insert(&mut self, record: TxRecord) -> Result<(), LedgerError> {
            self.txs.insert(record)
        }
        fn update(&mut self, record: TxRecord) -> Result<(), LedgerError> {
            self.txs.update(record)
        }
        fn next_id(&self) -> Result<u64, LedgerError> {
            self.txs.next_id()
        }
    }

    const COIN: Coin = Coin::Bitcoin;
    const NETWORK: Network = Network::Mainnet;

    fn derive_record(seed_byte: u8, account: AccountRole) -> KeyRecord {
        let seed = Seed::from_bytes(COIN, vec![seed_byte; 64]).unwrap();
        let deriver = KeyDeriver::new(COIN, NETWORK);
        let keys = deriver.derive_batch(&seed, account, 0, 1).unwrap();
        KeyRecord::from_derived(COIN, account, &keys[0])
    }

    /// Two independent deposit wallets sharing a 2-of-2 multisig address
    fn multisig_wallets() -> (MemoryWallet, MemoryWallet, String, String) {
        let record_a = derive_record(1, AccountRole::Deposit);
        let record_b = derive_record(2, AccountRole::Deposit);

        let script = RedeemScript::multisig(
            2,
            &[
                record_a.full_public_key.clone(),
                record_b.full_public_key.clone(),
            ],
        )
        .unwrap();
        let params = COIN.network_params(NETWORK);
        let address = script.p2sh_address(&params);

        let mut wallet_a = MemoryWallet::default();
        let mut wallet_b = MemoryWallet::default();
        for (wallet, record) in [(&mut wallet_a, record_a), (&mut wallet_b, record_b)] {
            wallet.insert_bulk(vec![record.clone()]).unwrap();
            wallet
                .update_multisig_fields(
                    AccountRole::Deposit,
                    &[record.full_public_key.clone()],
                    &address,
                    &script.to_hex(),
                )
                .unwrap();
        }
        (wallet_a, wallet_b, address, script.to_hex())
    }

    fn unsigned_artifact(
        store: &FileStore,
        address: &str,
        with_script: Option<String>,
    ) -> PathBuf {
        let prev = vec![PrevOutput {
            txid: "ab".repeat(32),
            vout: 0,
            address: address.to_string(),
            amount: 80_000,
        }];
        let tx = RawTransaction::unsigned(
            &prev,
            vec![TxOutput {
                address: "1Dest".to_string(),
                amount: 79_000,
            }],
        );
        let artifact = Artifact {
            tx_hex: tx.encode_hex().unwrap(),
            bundle: Some(PrevTxBundle {
                prev_outputs: prev,
                sender_account: AccountRole::Deposit,
                redeem_script: with_script,
            }),
        };
        let name = ArtifactName::unsigned(TxAction::Payment, 1, 0);
        store
            .write(&name.to_file_name(), &artifact.to_body().unwrap())
            .unwrap()
    }

    #[test]
    fn test_two_pass_multisig_signing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, mut wallet_b, address, script_hex) = multisig_wallets();

        // First pass knows the script from its own ledger records
        let path = unsigned_artifact(&store, &address, None);
        let first = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap();
        assert!(!first.is_signed);
        assert_eq!(first.signed_count, 1);
        assert!(first.output_path.ends_with("payment_1_unsigned_1"));

        // The script now rides in the bundle
        let body = store.read(&first.output_path).unwrap();
        let carried = Artifact::parse_body(&body).unwrap().bundle.unwrap();
        assert_eq!(carried.redeem_script.as_deref(), Some(script_hex.as_str()));

        let second = SigningCoordinator::new(&mut wallet_b, &store, COIN, NETWORK)
            .sign_artifact_file(&first.output_path)
            .unwrap();
        assert!(second.is_signed);
        assert!(second.output_path.ends_with("payment_1_signed"));

        // Signed artifact carries the transaction only
        let signed_body = store.read(&second.output_path).unwrap();
        let signed = Artifact::parse_body(&signed_body).unwrap();
        assert!(signed.bundle.is_none());
        let tx = RawTransaction::decode_hex(&signed.tx_hex).unwrap();
        assert_eq!(tx.inputs[0].signatures.len(), 2);
    }

    #[test]
    fn test_signer_order_does_not_matter() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, mut wallet_b, address, _) = multisig_wallets();

        let path = unsigned_artifact(&store, &address, None);
        let first = SigningCoordinator::new(&mut wallet_b, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap();
        let second = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&first.output_path)
            .unwrap();
        assert!(second.is_signed);
    }

    #[test]
    fn test_repeated_pass_by_same_wallet_stays_partial() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, _, address, _) = multisig_wallets();

        let path = unsigned_artifact(&store, &address, None);
        let first = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap();
        let again = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&first.output_path)
            .unwrap();
        assert!(!again.is_signed);
        assert_eq!(again.signed_count, 2);
    }

    #[test]
    fn test_bookkeeping_row_moves_to_signed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, mut wallet_b, address, _) = multisig_wallets();

        let path = unsigned_artifact(&store, &address, None);
        let body = store.read(&path).unwrap();
        let tx_hex = Artifact::parse_body(&body).unwrap().tx_hex;
        TxRecordRepository::insert(
            &mut wallet_b,
            TxRecord::new(1, COIN, TxAction::Payment, tx_hex, 80_000, 79_000),
        )
        .unwrap();

        let first = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap();
        let second = SigningCoordinator::new(&mut wallet_b, &store, COIN, NETWORK)
            .sign_artifact_file(&first.output_path)
            .unwrap();
        assert!(second.is_signed);

        let row = TxRecordRepository::get_one(&wallet_b, 1).unwrap().unwrap();
        assert_eq!(row.tx_type, crate::ledger::TxType::Signed);
        assert!(row.signed_hex.is_some());
    }

    #[test]
    fn test_single_key_client_spend_signs_in_one_pass() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let record = derive_record(3, AccountRole::Client);
        let mut wallet = MemoryWallet::default();
        wallet.insert_bulk(vec![record.clone()]).unwrap();

        let prev = vec![PrevOutput {
            txid: "cd".repeat(32),
            vout: 1,
            address: record.p2pkh_address.clone(),
            amount: 5_000,
        }];
        let tx = RawTransaction::unsigned(
            &prev,
            vec![TxOutput {
                address: "1Dest".to_string(),
                amount: 4_500,
            }],
        );
        let artifact = Artifact {
            tx_hex: tx.encode_hex().unwrap(),
            bundle: Some(PrevTxBundle {
                prev_outputs: prev,
                sender_account: AccountRole::Client,
                redeem_script: None,
            }),
        };
        let name = ArtifactName::unsigned(TxAction::Transfer, 4, 0);
        let path = store
            .write(&name.to_file_name(), &artifact.to_body().unwrap())
            .unwrap();

        let report = SigningCoordinator::new(&mut wallet, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap();
        assert!(report.is_signed);
        assert!(report.output_path.ends_with("transfer_4_signed"));
    }

    #[test]
    fn test_signed_artifact_refused_as_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, _, _, _) = multisig_wallets();

        let path = store.write("payment_1_signed", "00ff").unwrap();
        let err = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap_err();
        assert!(matches!(err, SigningError::MalformedArtifact(_)));
    }

    #[test]
    fn test_exhausted_pass_counter_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, _, address, _) = multisig_wallets();

        // A valid body under the last representable pass count
        let body = store.read(&unsigned_artifact(&store, &address, None)).unwrap();
        let path = store.write("payment_1_unsigned_255", &body).unwrap();
        let err = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap_err();
        assert!(matches!(err, SigningError::MalformedArtifact(_)));
    }

    #[test]
    fn test_bundle_is_mandatory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, _, address, _) = multisig_wallets();

        let prev = vec![PrevOutput {
            txid: "ab".repeat(32),
            vout: 0,
            address,
            amount: 80_000,
        }];
        let tx = RawTransaction::unsigned(&prev, vec![]);
        let path = store
            .write("payment_2_unsigned_0", &tx.encode_hex().unwrap())
            .unwrap();
        let err = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap_err();
        assert!(matches!(err, SigningError::MalformedArtifact(_)));
    }

    #[test]
    fn test_corrupt_wif_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let (mut wallet_a, _, address, _) = multisig_wallets();

        // Corrupt the stored key material
        wallet_a.keys.records[0].wif = "not-a-wif".to_string();
        let path = unsigned_artifact(&store, &address, None);
        let err = SigningCoordinator::new(&mut wallet_a, &store, COIN, NETWORK)
            .sign_artifact_file(&path)
            .unwrap_err();
        assert!(matches!(err, SigningError::KeyDecode(_)));
    }
}
