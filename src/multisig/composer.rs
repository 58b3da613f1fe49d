//! Multisig composition from independently contributed public keys
//!
//! Once every required participant's key has arrived (in any order),
//! the composer builds the redeem script and P2SH address and attaches
//! them to every contributing key record.

use crate::coin::{AccountRole, Coin, Network};
use crate::ledger::{KeyRecordRepository, KeyStatus};
use crate::multisig::script::RedeemScript;
use crate::multisig::MultisigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// M-of-N signing policy for one logical account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigPolicy {
    /// Signatures required to spend (M)
    pub threshold: u8,
    /// Labels of the participant roles that must contribute a key;
    /// its length is N
    pub participants: Vec<String>,
}

impl MultisigPolicy {
    pub fn required(&self) -> usize {
        self.participants.len()
    }
}

/// Static per-account multisig configuration, loaded once at startup
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParticipantSet {
    policies: HashMap<AccountRole, MultisigPolicy>,
}

impl ParticipantSet {
    pub fn new(policies: HashMap<AccountRole, MultisigPolicy>) -> Result<Self, MultisigError> {
        for (account, policy) in &policies {
            if policy.threshold == 0 || usize::from(policy.threshold) > policy.required() {
                return Err(MultisigError::InvalidThreshold(format!(
                    "account {}: {}-of-{}",
                    account,
                    policy.threshold,
                    policy.required()
                )));
            }
        }
        Ok(Self { policies })
    }

    /// Conventional 2-of-2 deposit/payment setup with one co-signer
    pub fn default_two_of_two() -> Self {
        let policy = MultisigPolicy {
            threshold: 2,
            participants: vec!["keygen".to_string(), "auth1".to_string()],
        };
        let mut policies = HashMap::new();
        policies.insert(AccountRole::Deposit, policy.clone());
        policies.insert(AccountRole::Payment, policy);
        Self { policies }
    }

    pub fn policy_for(&self, account: AccountRole) -> Option<&MultisigPolicy> {
        self.policies.get(&account)
    }
}

/// Result of a successful composition
#[derive(Clone, Debug)]
pub struct ComposedMultisig {
    pub account: AccountRole,
    pub multisig_address: String,
    pub redeem_script: RedeemScript,
    /// The contributing keys, in script (sorted) order
    pub pubkeys: Vec<String>,
}

/// Builds and attaches multisig addresses per the participant set
pub struct MultisigComposer {
    set: ParticipantSet,
    coin: Coin,
    network: Network,
}

impl MultisigComposer {
    pub fn new(set: ParticipantSet, coin: Coin, network: Network) -> Self {
        Self { set, coin, network }
    }

    pub fn participant_set(&self) -> &ParticipantSet {
        &self.set
    }

    /// Compose the redeem script and address for an account
    ///
    /// Fails with `IncompleteParticipants` until all N required keys
    /// have been contributed. Re-running with the same key set yields
    /// the identical script and address.
    pub fn compose(
        &self,
        account: AccountRole,
        pubkeys: &[String],
    ) -> Result<ComposedMultisig, MultisigError> {
        let policy = self
            .set
            .policy_for(account)
            .ok_or(MultisigError::NoPolicy(account))?;

        if pubkeys.len() < policy.required() {
            return Err(MultisigError::IncompleteParticipants {
                have: pubkeys.len(),
                need: policy.required(),
            });
        }

        let redeem_script = RedeemScript::multisig(policy.threshold, pubkeys)?;
        let params = self.coin.network_params(self.network);
        let multisig_address = redeem_script.p2sh_address(&params);
        let script_pubkeys = redeem_script.pubkeys();

        Ok(ComposedMultisig {
            account,
            multisig_address,
            redeem_script,
            pubkeys: script_pubkeys,
        })
    }

    /// Attach the composed script/address to every contributing record
    ///
    /// The repository updates record-by-record; the operation is keyed
    /// by full public key and safe to re-run after a partial failure.
    pub fn attach(
        &self,
        repository: &mut impl KeyRecordRepository,
        composed: &ComposedMultisig,
    ) -> Result<usize, MultisigError> {
        let updated = repository.update_multisig_fields(
            composed.account,
            &composed.pubkeys,
            &composed.multisig_address,
            &composed.redeem_script.to_hex(),
        )?;
        log::info!(
            "attached multisig address {} to {} key records ({})",
            composed.multisig_address,
            updated,
            composed.account
        );
        Ok(updated)
    }

    /// Keys of this wallet that are eligible to contribute to `account`
    ///
    /// Already-composed keys stay eligible so a re-run (after a crash
    /// mid-attach, or with the same input file) reproduces the identical
    /// address instead of failing short of participants.
    pub fn eligible_keys(
        &self,
        repository: &impl KeyRecordRepository,
        account: AccountRole,
    ) -> Result<Vec<String>, MultisigError> {
        let mut pubkeys: Vec<String> = repository
            .get_all_by_status(account, KeyStatus::AddressExported)?
            .into_iter()
            .map(|r| r.full_public_key)
            .collect();
        pubkeys.extend(
            repository
                .get_all_by_status(account, KeyStatus::MultisigAddressGenerated)?
                .into_iter()
                .map(|r| r.full_public_key),
        );
        Ok(pubkeys)
    }
}
