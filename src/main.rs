//! Cold-wallet CLI
//!
//! One binary serves the keygen and sign roles of the segmented custody
//! setup. Every command works offline; files written under the data
//! directory are the only way material leaves the machine.

use clap::{Parser, Subcommand};
use coldvault::cli::{self, AppState};
use coldvault::coin::{AccountRole, Coin, Network, WalletRole};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coldvault")]
#[command(version = "0.1.0")]
#[command(about = "Segmented cold-wallet key management and signing", long_about = None)]
struct Cli {
    /// Data directory for the wallet database and artifact files
    #[arg(short, long, default_value = ".wallet_data")]
    data_dir: PathBuf,

    /// Wallet role this machine runs as
    #[arg(short, long, value_enum, default_value_t = WalletRole::Keygen)]
    role: WalletRole,

    /// Coin to operate on
    #[arg(short, long, value_enum, default_value_t = Coin::Bitcoin)]
    coin: Coin,

    /// Network to encode addresses for
    #[arg(short, long, value_enum, default_value_t = Network::Mainnet)]
    network: Network,

    /// Log every wallet database load and save
    #[arg(long)]
    trace_io: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Master seed operations
    Seed {
        #[command(subcommand)]
        action: SeedCommands,
    },

    /// Derive and register HD keys
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Export addresses for the watch wallet
    Address {
        #[command(subcommand)]
        action: AddressCommands,
    },

    /// Export full public keys for multisig composition
    Pubkey {
        #[command(subcommand)]
        action: PubkeyCommands,
    },

    /// Multisig address composition
    Multisig {
        #[command(subcommand)]
        action: MultisigCommands,
    },

    /// Apply this wallet's signatures to an unsigned artifact file
    Sign {
        /// Artifact file to sign
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SeedCommands {
    /// Generate the master seed (keeps an existing one)
    Generate,
    /// Store operator-supplied seed material (base64)
    Store { seed: String },
    /// Recover the seed from a BIP39 mnemonic phrase
    Recover {
        /// Mnemonic phrase, quoted
        mnemonic: String,

        /// Optional BIP39 passphrase
        #[arg(long, default_value = "")]
        passphrase: String,
    },
    /// Print the stored seed (base64)
    Show,
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Derive fresh keys, continuing from the highest stored index
    Derive {
        /// Logical account to derive for
        #[arg(short, long, value_enum)]
        account: AccountRole,

        /// Number of keys to derive
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Stage pending private keys for node-wallet import
    Import {
        #[arg(short, long, value_enum)]
        account: AccountRole,
    },
}

#[derive(Subcommand)]
enum AddressCommands {
    /// Write the address export file and mark the keys exported
    Export {
        #[arg(short, long, value_enum)]
        account: AccountRole,
    },
}

#[derive(Subcommand)]
enum PubkeyCommands {
    /// Write the full-pubkey export file
    Export {
        /// Account the keys will participate in
        #[arg(short, long, value_enum)]
        account: AccountRole,
    },
}

#[derive(Subcommand)]
enum MultisigCommands {
    /// Compose the multisig address from an imported pubkey file
    Compose {
        #[arg(short, long, value_enum)]
        account: AccountRole,

        /// Pubkey export file received from the co-signing wallet
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let mut state = AppState::new(
        args.role,
        args.coin,
        args.network,
        args.data_dir,
        args.trace_io,
    )?;

    match args.command {
        Commands::Seed { action } => match action {
            SeedCommands::Generate => cli::commands::cmd_seed_generate(&mut state)?,
            SeedCommands::Store { seed } => cli::commands::cmd_seed_store(&mut state, &seed)?,
            SeedCommands::Recover {
                mnemonic,
                passphrase,
            } => cli::commands::cmd_seed_recover(&mut state, &mnemonic, &passphrase)?,
            SeedCommands::Show => cli::commands::cmd_seed_show(&state)?,
        },
        Commands::Key { action } => match action {
            KeyCommands::Derive { account, count } => {
                cli::commands::cmd_key_derive(&mut state, account, count)?
            }
            KeyCommands::Import { account } => {
                cli::commands::cmd_key_import(&mut state, account)?
            }
        },
        Commands::Address { action } => match action {
            AddressCommands::Export { account } => {
                cli::commands::cmd_address_export(&mut state, account)?
            }
        },
        Commands::Pubkey { action } => match action {
            PubkeyCommands::Export { account } => {
                cli::commands::cmd_pubkey_export(&mut state, account)?
            }
        },
        Commands::Multisig { action } => match action {
            MultisigCommands::Compose { account, file } => {
                cli::commands::cmd_multisig_compose(&mut state, account, &file)?
            }
        },
        Commands::Sign { file } => cli::commands::cmd_sign(&mut state, &file)?,
    }

    Ok(())
}
