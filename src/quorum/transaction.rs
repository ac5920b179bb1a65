// ============================================================================
// Quorum Transactions - Staged Calls Awaiting Signatures
// ============================================================================

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

use crate::accounts::Address;
use crate::clock::Timestamp;
use crate::ledger::Amount;
use crate::oracle::QuestionId;

/// Sequential transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a quorum transaction does once executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallPayload {
    /// Ask the oracle to settle an assertion
    SettleAssertion { question_id: QuestionId, claim: String },
    /// Free-form call, dispatched by method name
    Custom { method: String, args: serde_json::Value },
}

impl CallPayload {
    /// 32-byte digest reported in `TransactionCreated`
    pub fn digest(&self) -> QuestionId {
        match self {
            CallPayload::SettleAssertion { question_id, .. } => *question_id,
            CallPayload::Custom { .. } => {
                let encoded = serde_json::to_vec(self).unwrap_or_default();
                QuestionId::from_digest(&Sha256::digest(&encoded))
            }
        }
    }

    /// Human readable text reported in `TransactionCreated`
    pub fn description(&self) -> String {
        match self {
            CallPayload::SettleAssertion { claim, .. } => claim.clone(),
            CallPayload::Custom { method, .. } => method.clone(),
        }
    }
}

/// A staged call plus its signature set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumTransaction {
    pub id: TxId,
    pub proposer: Address,
    pub target: Address,
    pub payload: CallPayload,
    pub value: Amount,
    pub created_at: Timestamp,
    pub signatures: BTreeSet<Address>,
    pub executed: bool,
}

impl QuorumTransaction {
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Earliest time the transaction may execute
    pub fn ready_at(&self, cooldown_secs: u64) -> Timestamp {
        self.created_at.saturating_add(cooldown_secs)
    }
}

// ============================================================================
// CALL TARGETS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CallError {
    pub code: &'static str,
    pub message: String,
}

impl CallError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Receiver of executed quorum transactions
pub trait CallTarget {
    /// Whether this dispatcher handles calls addressed to `target`
    fn accepts(&self, target: &Address) -> bool;

    /// Whether `invoke` could ever carry out this payload and value.
    /// Checked when a transaction is proposed and again before execution.
    fn check(&self, payload: &CallPayload, value: Amount) -> Result<(), CallError>;

    /// Perform the call. `caller` is the wallet's own address.
    fn invoke(
        &mut self,
        caller: &Address,
        target: &Address,
        payload: &CallPayload,
        value: Amount,
    ) -> Result<(), CallError>;
}
