//! CLI command handlers
//!
//! Each handler wires a wallet facade operation to terminal output. The
//! handlers stay thin; behavior lives in the library modules.

use crate::coin::{AccountRole, Coin, Network, WalletRole};
use crate::ledger::PrivKeyImporter;
use crate::multisig::ParticipantSet;
use crate::seed::Seed;
use crate::storage::StorageConfig;
use crate::wallet::{KeygenWallet, SignWallet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state: the facade for the selected role
pub enum AppState {
    Keygen(KeygenWallet),
    Sign(SignWallet),
}

impl AppState {
    /// Initialize the facade for the selected role
    pub fn new(
        role: WalletRole,
        coin: Coin,
        network: Network,
        data_dir: PathBuf,
        trace_io: bool,
    ) -> CliResult<Self> {
        let storage = StorageConfig {
            data_dir,
            trace_io,
            ..Default::default()
        };
        Ok(match role {
            WalletRole::Keygen => AppState::Keygen(KeygenWallet::new(
                coin,
                network,
                &storage,
                ParticipantSet::default_two_of_two(),
            )?),
            WalletRole::Sign => AppState::Sign(SignWallet::new(coin, network, &storage)?),
            WalletRole::Watch => {
                return Err("the watch role has no cold-wallet commands".into());
            }
        })
    }
}

/// Node-wallet stand-in that appends WIFs to an export file
///
/// The cold machine has no node to import into; the file is carried to
/// the node machine and fed to its import tooling.
pub struct FileKeyImporter {
    path: PathBuf,
}

impl FileKeyImporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PrivKeyImporter for FileKeyImporter {
    fn import_priv_key_without_rescan(&mut self, wif: &str, label: &str) -> Result<(), String> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| e.to_string())?;
        writeln!(file, "{},{}", wif, label).map_err(|e| e.to_string())
    }
}

pub fn cmd_seed_generate(state: &mut AppState) -> CliResult<()> {
    let seed = match state {
        AppState::Keygen(w) => w.ensure_seed()?,
        AppState::Sign(w) => w.ensure_seed()?,
    };
    println!("✅ Seed ready ({} bytes)", seed.as_bytes().len());
    Ok(())
}

pub fn cmd_seed_store(state: &mut AppState, encoded: &str) -> CliResult<()> {
    let seed = match state {
        AppState::Keygen(w) => w.store_seed(encoded)?,
        AppState::Sign(w) => w.store_seed(encoded)?,
    };
    println!("✅ Seed stored ({} bytes)", seed.as_bytes().len());
    Ok(())
}

pub fn cmd_seed_recover(
    state: &mut AppState,
    mnemonic: &str,
    passphrase: &str,
) -> CliResult<()> {
    let seed = match state {
        AppState::Keygen(w) => w.recover_seed(mnemonic, passphrase)?,
        AppState::Sign(w) => w.recover_seed(mnemonic, passphrase)?,
    };
    println!("✅ Seed recovered from mnemonic ({} bytes)", seed.as_bytes().len());
    Ok(())
}

pub fn cmd_seed_show(state: &AppState) -> CliResult<()> {
    let seed: Option<Seed> = match state {
        AppState::Keygen(w) => w.seed()?,
        AppState::Sign(_) => {
            return Err("the sign role does not display its seed".into());
        }
    };
    match seed {
        Some(seed) => println!("{}", seed.encode()),
        None => println!("⚠️  No seed stored yet"),
    }
    Ok(())
}

pub fn cmd_key_derive(state: &mut AppState, account: AccountRole, count: u32) -> CliResult<()> {
    let registered = match state {
        AppState::Keygen(w) => w.derive_keys(account, count)?,
        AppState::Sign(w) => {
            if account != AccountRole::Authorization {
                return Err("a sign wallet only derives authorization keys".into());
            }
            w.generate_auth_keys(count)?
        }
    };
    println!("✅ Derived and registered {} key(s) for {}", registered, account);
    Ok(())
}

pub fn cmd_key_import(state: &mut AppState, account: AccountRole) -> CliResult<()> {
    let AppState::Keygen(wallet) = state else {
        return Err("key import runs on the keygen wallet".into());
    };
    let export_path = wallet.artifact_store().path_for("node_import_keys");
    let mut importer = FileKeyImporter::new(export_path.clone());
    let summary = wallet.import_keys(account, &mut importer)?;
    if summary.nothing_to_do() {
        println!("Nothing to import for {}", account);
    } else {
        println!(
            "✅ Imported {} key(s), {} failed → {}",
            summary.imported,
            summary.failed,
            export_path.display()
        );
    }
    Ok(())
}

pub fn cmd_address_export(state: &mut AppState, account: AccountRole) -> CliResult<()> {
    let AppState::Keygen(wallet) = state else {
        return Err("address export runs on the keygen wallet".into());
    };
    match wallet.export_addresses(account)? {
        Some(path) => println!("✅ Addresses exported → {}", path.display()),
        None => println!("Nothing to export for {}", account),
    }
    Ok(())
}

pub fn cmd_pubkey_export(state: &mut AppState, account: AccountRole) -> CliResult<()> {
    let path = match state {
        AppState::Keygen(w) => w.export_pubkeys(account)?,
        AppState::Sign(w) => w.export_pubkeys(account)?,
    };
    match path {
        Some(path) => println!("✅ Public keys exported → {}", path.display()),
        None => println!("Nothing to export for {}", account),
    }
    Ok(())
}

pub fn cmd_multisig_compose(
    state: &mut AppState,
    account: AccountRole,
    pubkey_file: &Path,
) -> CliResult<()> {
    let AppState::Keygen(wallet) = state else {
        return Err("multisig composition runs on the keygen wallet".into());
    };
    let composed = wallet.compose_multisig(account, pubkey_file)?;
    println!("✅ Multisig address for {}: {}", account, composed.multisig_address);
    println!("   Redeem script: {}", composed.redeem_script.to_hex());
    Ok(())
}

pub fn cmd_sign(state: &mut AppState, file: &Path) -> CliResult<()> {
    let report = match state {
        AppState::Keygen(w) => w.sign_artifact(file)?,
        AppState::Sign(w) => w.sign_artifact(file)?,
    };

    if report.is_signed {
        println!("✅ Transaction {} fully signed", report.tx_id);
    } else {
        println!(
            "✍️  Signature added (pass {}); transaction {} is not yet complete",
            report.signed_count, report.tx_id
        );
    }
    println!("   → {}", report.output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_importer_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node_import_keys");
        let mut importer = FileKeyImporter::new(path.clone());

        importer
            .import_priv_key_without_rescan("wif1", "client_0")
            .unwrap();
        importer
            .import_priv_key_without_rescan("wif2", "client_1")
            .unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "wif1,client_0\nwif2,client_1\n");
    }

    #[test]
    fn test_watch_role_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(
            WalletRole::Watch,
            Coin::Bitcoin,
            Network::Testnet,
            dir.path().to_path_buf(),
            false,
        )
        .is_err());
    }
}
