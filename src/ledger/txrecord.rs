//! Transaction bookkeeping records
//!
//! One row per transaction, tracking its lifecycle from the first
//! unsigned persist through broadcast. Rows are never deleted outside
//! explicit reset tooling.

use crate::coin::Coin;
use crate::ledger::repository::LedgerError;
use crate::signing::artifact::TxAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction lifecycle stage
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum TxType {
    /// Built by the watch wallet, not yet fully signed
    Unsigned,
    /// All required signatures collected
    Signed,
    /// Broadcast to the network
    Sent,
    /// Confirmed / settled
    Done,
    /// Abandoned; terminal
    Canceled,
}

impl TxType {
    /// Whether a transition to `next` is legal
    pub fn can_transition_to(&self, next: TxType) -> bool {
        match (self, next) {
            (_, TxType::Canceled) => *self != TxType::Done && *self != TxType::Canceled,
            (TxType::Unsigned, TxType::Signed)
            | (TxType::Signed, TxType::Sent)
            | (TxType::Sent, TxType::Done) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Unsigned => "unsigned",
            TxType::Signed => "signed",
            TxType::Sent => "sent",
            TxType::Done => "done",
            TxType::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping row for one transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_id: u64,
    pub coin: Coin,
    pub action: TxAction,
    pub unsigned_hex: String,
    pub signed_hex: Option<String>,
    /// Network transaction hash once broadcast
    pub sent_hash: Option<String>,
    pub total_input_amount: u64,
    pub total_output_amount: u64,
    pub fee: u64,
    pub tx_type: TxType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TxRecord {
    pub fn new(
        tx_id: u64,
        coin: Coin,
        action: TxAction,
        unsigned_hex: String,
        total_input_amount: u64,
        total_output_amount: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            tx_id,
            coin,
            action,
            unsigned_hex,
            signed_hex: None,
            sent_hash: None,
            total_input_amount,
            total_output_amount,
            fee: total_input_amount.saturating_sub(total_output_amount),
            tx_type: TxType::Unsigned,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the fully signed hex and move to `Signed`
    pub fn attach_signed_hex(&mut self, hex: String) -> Result<(), LedgerError> {
        self.transition(TxType::Signed)?;
        self.signed_hex = Some(hex);
        Ok(())
    }

    /// Record the broadcast hash and move to `Sent`
    pub fn attach_sent_hash(&mut self, hash: String) -> Result<(), LedgerError> {
        self.transition(TxType::Sent)?;
        self.sent_hash = Some(hash);
        Ok(())
    }

    pub fn transition(&mut self, next: TxType) -> Result<(), LedgerError> {
        if !self.tx_type.can_transition_to(next) {
            return Err(LedgerError::Repository {
                op: "tx_transition",
                message: format!("illegal transition {} -> {}", self.tx_type, next),
            });
        }
        self.tx_type = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Persistence collaborator for transaction records
pub trait TxRecordRepository {
    fn get_one(&self, tx_id: u64) -> Result<Option<TxRecord>, LedgerError>;
    fn insert(&mut self, record: TxRecord) -> Result<(), LedgerError>;
    fn update(&mut self, record: TxRecord) -> Result<(), LedgerError>;
    /// Next free transaction identifier
    fn next_id(&self) -> Result<u64, LedgerError>;
}
