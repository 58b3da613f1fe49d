//! Artifact files crossing the air gap
//!
//! An artifact is a plain file whose name encodes the pipeline position
//! (`{action}_{txid}_{stage}_{signed_count}`) and whose body carries the
//! hex transaction, optionally followed by a comma and a base64 bundle
//! of previous-output metadata. The formats are stable; files written by
//! old versions must keep parsing.

use crate::coin::AccountRole;
use crate::signing::transaction::PrevOutput;
use crate::signing::SigningError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business action a transaction performs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxAction {
    Deposit,
    Payment,
    Transfer,
}

impl fmt::Display for TxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxAction::Deposit => "deposit",
            TxAction::Payment => "payment",
            TxAction::Transfer => "transfer",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TxAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TxAction::Deposit),
            "payment" => Ok(TxAction::Payment),
            "transfer" => Ok(TxAction::Transfer),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// Pipeline stage an artifact file sits at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStage {
    Unsigned,
    Signed,
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxStage::Unsigned => "unsigned",
            TxStage::Signed => "signed",
        };
        write!(f, "{}", name)
    }
}

/// Structured artifact file name
///
/// Unsigned artifacts carry the number of signing passes applied so far
/// (`payment_5_unsigned_1`); a fully signed artifact drops the count
/// (`payment_5_signed`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArtifactName {
    pub action: TxAction,
    pub tx_id: u64,
    pub stage: TxStage,
    pub signed_count: u8,
}

impl ArtifactName {
    pub fn unsigned(action: TxAction, tx_id: u64, signed_count: u8) -> Self {
        Self {
            action,
            tx_id,
            stage: TxStage::Unsigned,
            signed_count,
        }
    }

    pub fn signed(action: TxAction, tx_id: u64) -> Self {
        Self {
            action,
            tx_id,
            stage: TxStage::Signed,
            signed_count: 0,
        }
    }

    pub fn to_file_name(&self) -> String {
        match self.stage {
            TxStage::Unsigned => format!(
                "{}_{}_{}_{}",
                self.action, self.tx_id, self.stage, self.signed_count
            ),
            TxStage::Signed => format!("{}_{}_{}", self.action, self.tx_id, self.stage),
        }
    }

    /// Parse a file name in either the 4-part unsigned or 3-part signed form
    pub fn parse(name: &str) -> Result<Self, SigningError> {
        let malformed =
            |msg: &str| SigningError::MalformedArtifact(format!("file name {:?}: {}", name, msg));

        let parts: Vec<&str> = name.split('_').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(malformed("expected 3 or 4 underscore-separated parts"));
        }
        let action = parts[0]
            .parse::<TxAction>()
            .map_err(|e| malformed(&e))?;
        let tx_id = parts[1]
            .parse::<u64>()
            .map_err(|_| malformed("transaction id not a number"))?;
        match (parts[2], parts.len()) {
            ("unsigned", 4) => {
                let signed_count = parts[3]
                    .parse::<u8>()
                    .map_err(|_| malformed("signed count not a number"))?;
                Ok(Self::unsigned(action, tx_id, signed_count))
            }
            ("signed", 3) => Ok(Self::signed(action, tx_id)),
            _ => Err(malformed("stage does not match part count")),
        }
    }
}

/// Previous-output metadata travelling beside an unsigned transaction
///
/// Produced by the watch wallet that built the transaction; signers need
/// it to locate their keys and to compute signing digests.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrevTxBundle {
    pub prev_outputs: Vec<PrevOutput>,
    /// Account whose keys own the spent outputs
    pub sender_account: AccountRole,
    /// Redeem script attached once the first signer resolves it
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub redeem_script: Option<String>,
}

impl PrevTxBundle {
    pub fn encode(&self) -> Result<String, SigningError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| SigningError::MalformedArtifact(e.to_string()))?;
        Ok(BASE64.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self, SigningError> {
        let json = BASE64
            .decode(encoded.trim())
            .map_err(|e| SigningError::MalformedArtifact(format!("bundle not base64: {}", e)))?;
        serde_json::from_slice(&json)
            .map_err(|e| SigningError::MalformedArtifact(format!("bundle not decodable: {}", e)))
    }
}

/// Parsed artifact body
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub tx_hex: String,
    pub bundle: Option<PrevTxBundle>,
}

impl Artifact {
    /// Render the body: `hex_tx` or `hex_tx,base64_bundle`
    pub fn to_body(&self) -> Result<String, SigningError> {
        match &self.bundle {
            Some(bundle) => Ok(format!("{},{}", self.tx_hex, bundle.encode()?)),
            None => Ok(self.tx_hex.clone()),
        }
    }

    pub fn parse_body(body: &str) -> Result<Self, SigningError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(SigningError::MalformedArtifact("empty body".to_string()));
        }
        match body.split_once(',') {
            Some((tx_hex, bundle)) => Ok(Self {
                tx_hex: tx_hex.to_string(),
                bundle: Some(PrevTxBundle::decode(bundle)?),
            }),
            None => Ok(Self {
                tx_hex: body.to_string(),
                bundle: None,
            }),
        }
    }
}
