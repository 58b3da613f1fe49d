//! Air-gap file formats for public data
//!
//! Two line formats cross the gap: full-pubkey lines feeding multisig
//! composition on the other side, and address export lines feeding the
//! watch wallet. Both are stable formats; existing artifacts must keep
//! parsing forever.

use crate::coin::{AccountRole, Coin};
use crate::ledger::KeyRecord;
use std::collections::HashSet;
use thiserror::Error;

/// Errors in export/import line handling
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Malformed line {line_no}: {message}")]
    MalformedLine { line_no: usize, message: String },
    #[error("Coin mismatch: expected {expected}, line has {got}")]
    CoinMismatch { expected: Coin, got: Coin },
}

/// One full public key with its coin and logical-role tag
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PubkeyEntry {
    pub coin: Coin,
    pub role: AccountRole,
    pub full_public_key: String,
}

impl PubkeyEntry {
    /// Render the stable `coin,role,full_pubkey_hex` line
    pub fn to_line(&self) -> String {
        format!("{},{},{}", self.coin, self.role, self.full_public_key)
    }

    /// Parse and validate one line
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, ExchangeError> {
        let malformed = |message: String| ExchangeError::MalformedLine { line_no, message };

        let mut fields = line.trim().split(',');
        let coin = fields
            .next()
            .ok_or_else(|| malformed("missing coin".to_string()))?
            .parse::<Coin>()
            .map_err(malformed)?;
        let role = fields
            .next()
            .ok_or_else(|| malformed("missing role".to_string()))?
            .parse::<AccountRole>()
            .map_err(malformed)?;
        let full_public_key = fields
            .next()
            .ok_or_else(|| malformed("missing public key".to_string()))?
            .to_string();
        if fields.next().is_some() {
            return Err(malformed("trailing fields".to_string()));
        }

        let bytes = hex::decode(&full_public_key)
            .map_err(|e| malformed(format!("public key not hex: {}", e)))?;
        if bytes.len() != 33 || !matches!(bytes[0], 0x02 | 0x03) {
            return Err(malformed("not a compressed public key".to_string()));
        }

        Ok(Self {
            coin,
            role,
            full_public_key,
        })
    }
}

/// Serializes and parses pubkey files crossing the air gap
pub struct PubkeyExchange {
    coin: Coin,
}

impl PubkeyExchange {
    pub fn new(coin: Coin) -> Self {
        Self { coin }
    }

    /// Render the export file body for a set of keys
    pub fn export(&self, role: AccountRole, pubkeys: &[String]) -> String {
        let mut body = String::new();
        for pubkey in pubkeys {
            body.push_str(
                &PubkeyEntry {
                    coin: self.coin,
                    role,
                    full_public_key: pubkey.clone(),
                }
                .to_line(),
            );
            body.push('\n');
        }
        body
    }

    /// Parse an import file, dropping keys already known
    ///
    /// A duplicate is a logged no-op, not an error: re-importing the
    /// same file after a partial run must succeed.
    pub fn import(
        &self,
        content: &str,
        known_pubkeys: &HashSet<String>,
    ) -> Result<Vec<PubkeyEntry>, ExchangeError> {
        let mut entries = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = PubkeyEntry::parse_line(line, i + 1)?;
            if entry.coin != self.coin {
                return Err(ExchangeError::CoinMismatch {
                    expected: self.coin,
                    got: entry.coin,
                });
            }
            if known_pubkeys.contains(&entry.full_public_key) {
                log::info!(
                    "pubkey {} already recorded, skipping",
                    entry.full_public_key
                );
                continue;
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Render address export lines for the watch wallet
///
/// Stable format:
/// `account,p2pkh_address,p2sh_segwit_address,full_pubkey_hex,multisig_address,index`
/// with an empty multisig field for non-multisig keys.
pub fn address_export_body(records: &[KeyRecord]) -> String {
    let mut body = String::new();
    for record in records {
        body.push_str(&format!(
            "{},{},{},{},{},{}\n",
            record.account,
            record.p2pkh_address,
            record.p2sh_segwit_address,
            record.full_public_key,
            record.multisig_address.as_deref().unwrap_or(""),
            record.index,
        ));
    }
    body
}
