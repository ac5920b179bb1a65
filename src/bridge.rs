//! Resolution Bridge
//!
//! Connects markets to the truth oracle while keeping settlement behind the
//! quorum wallet.
//!
//! Resolution Flow:
//! 1. A market asserts its question: the bridge asks the oracle for a
//!    question id and stages a settlement transaction on the quorum wallet
//! 2. Signers approve the transaction and wait out the cooldown
//! 3. The wallet executes: the bridge forwards the settlement to the oracle
//!    with the wallet as caller, and records the oracle's verdict
//! 4. The market reads the verdict through `get_result`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::accounts::Address;
use crate::clock::{SharedClock, Timestamp};
use crate::events::{Event, EventLog};
use crate::ledger::Amount;
use crate::oracle::{OptimisticOracle, OracleError, QuestionId, TruthOracle};
use crate::quorum::{CallError, CallPayload, CallTarget, QuorumWallet, TxId, WalletError};

// ============================================================================
// ASSERTION STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionStatus {
    /// Waiting for the quorum wallet to execute the settlement
    Pending,
    /// Oracle verdict recorded
    Settled,
}

impl AssertionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssertionStatus::Pending => "pending",
            AssertionStatus::Settled => "settled",
        }
    }
}

// ============================================================================
// ASSERTION
// ============================================================================

/// A claim handed to the oracle and awaiting quorum-gated settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    /// Oracle-assigned identifier
    pub question_id: QuestionId,
    /// Claim text as asserted
    pub claim: String,
    /// Who asked for the assertion
    pub assertor: Address,
    /// When the assertion was opened
    pub created_at: Timestamp,
    /// The staged settlement transaction on the quorum wallet
    pub tx_id: TxId,
    /// Pending until the oracle verdict arrives
    pub status: AssertionStatus,
    /// Oracle verdict (meaningful only once settled)
    pub result: bool,
    /// When the verdict was recorded
    pub settled_at: Option<Timestamp>,
}

impl Assertion {
    pub fn is_settled(&self) -> bool {
        self.status == AssertionStatus::Settled
    }
}

/// Handle returned to whoever opened an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionTicket {
    pub question_id: QuestionId,
    pub tx_id: TxId,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("claim text must not be empty")]
    EmptyClaim,

    #[error("unknown assertion {0}")]
    UnknownAssertion(QuestionId),

    #[error("assertion {0} is not settled yet")]
    NotSettled(QuestionId),

    #[error("assertion {0} already settled")]
    AlreadySettled(QuestionId),

    #[error("bridge cannot dispatch {0} calls")]
    UnsupportedCall(String),

    #[error("bridge calls carry no value, got {0}")]
    ValueNotSupported(Amount),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::EmptyClaim => "EmptyClaim",
            BridgeError::UnknownAssertion(_) => "UnknownAssertion",
            BridgeError::NotSettled(_) => "NotSettled",
            BridgeError::AlreadySettled(_) => "AlreadySettled",
            BridgeError::UnsupportedCall(_) => "UnsupportedCall",
            BridgeError::ValueNotSupported(_) => "ValueNotSupported",
            BridgeError::Oracle(err) => err.code(),
            BridgeError::Wallet(err) => err.code(),
        }
    }
}

impl From<BridgeError> for CallError {
    fn from(err: BridgeError) -> Self {
        CallError::new(err.code(), err.to_string())
    }
}

// ============================================================================
// RESOLUTION BRIDGE
// ============================================================================

#[derive(Debug)]
pub struct ResolutionBridge<O: TruthOracle = OptimisticOracle> {
    address: Address,
    oracle: O,
    assertions: HashMap<QuestionId, Assertion>,
    clock: SharedClock,
    events: EventLog,
}

impl<O: TruthOracle> ResolutionBridge<O> {
    pub fn new(address: Address, oracle: O, clock: SharedClock, events: EventLog) -> Self {
        tracing::info!(
            address = %address.short(),
            oracle = %oracle.address().short(),
            "🌉 resolution bridge ready"
        );
        Self {
            address,
            oracle,
            assertions: HashMap::new(),
            clock,
            events,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn oracle_address(&self) -> &Address {
        self.oracle.address()
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn assertion(&self, question_id: &QuestionId) -> Option<&Assertion> {
        self.assertions.get(question_id)
    }

    /// All assertions, oldest first
    pub fn assertions(&self) -> Vec<&Assertion> {
        let mut all: Vec<&Assertion> = self.assertions.values().collect();
        all.sort_by_key(|a| (a.created_at, a.tx_id));
        all
    }

    /// Assert `question` with the oracle and stage its settlement on the
    /// quorum wallet. Does not settle anything.
    pub fn open_assertion(
        &mut self,
        wallet: &mut QuorumWallet,
        question: &str,
        assertor: &Address,
    ) -> Result<AssertionTicket, BridgeError> {
        if question.trim().is_empty() {
            return Err(BridgeError::EmptyClaim);
        }
        let now = self.clock.now();
        let question_id = self.oracle.assert_truth(question, assertor, now)?;

        let payload = CallPayload::SettleAssertion {
            question_id,
            claim: question.to_string(),
        };
        let target = self.oracle.address().clone();
        let tx_id = wallet.propose_transaction(&self.address, target, payload, 0, &*self)?;

        self.assertions.insert(
            question_id,
            Assertion {
                question_id,
                claim: question.to_string(),
                assertor: assertor.clone(),
                created_at: now,
                tx_id,
                status: AssertionStatus::Pending,
                result: false,
                settled_at: None,
            },
        );
        self.events.emit(
            &self.address,
            now,
            Event::AssertionCreated {
                question_id,
                assertor: assertor.clone(),
            },
        );
        tracing::info!(%question_id, %tx_id, assertor = %assertor.short(), "🌉 assertion opened");
        Ok(AssertionTicket { question_id, tx_id })
    }

    /// Settled verdict of an assertion
    pub fn get_result(&self, question_id: &QuestionId) -> Result<bool, BridgeError> {
        let assertion = self
            .assertions
            .get(question_id)
            .ok_or(BridgeError::UnknownAssertion(*question_id))?;
        if !assertion.is_settled() {
            return Err(BridgeError::NotSettled(*question_id));
        }
        Ok(assertion.result)
    }

    /// Oracle callback: record the verdict, once
    fn assertion_settled(&mut self, question_id: &QuestionId, result: bool) -> Result<(), BridgeError> {
        let now = self.clock.now();
        let assertion = self
            .assertions
            .get_mut(question_id)
            .ok_or(BridgeError::UnknownAssertion(*question_id))?;
        if assertion.is_settled() {
            return Err(BridgeError::AlreadySettled(*question_id));
        }
        assertion.status = AssertionStatus::Settled;
        assertion.result = result;
        assertion.settled_at = Some(now);

        self.events.emit(
            &self.address,
            now,
            Event::AssertionSettled {
                question_id: *question_id,
                result,
            },
        );
        tracing::info!(%question_id, result, "🌉 assertion settled");
        Ok(())
    }

    fn settle(&mut self, caller: &Address, question_id: &QuestionId) -> Result<(), BridgeError> {
        let assertion = self
            .assertions
            .get(question_id)
            .ok_or(BridgeError::UnknownAssertion(*question_id))?;
        if assertion.is_settled() {
            return Err(BridgeError::AlreadySettled(*question_id));
        }
        let verdict = self.oracle.settle(caller, question_id)?;
        self.assertion_settled(question_id, verdict)
    }
}

impl<O: TruthOracle> CallTarget for ResolutionBridge<O> {
    fn accepts(&self, target: &Address) -> bool {
        target == self.oracle.address()
    }

    fn check(&self, payload: &CallPayload, value: Amount) -> Result<(), CallError> {
        if value > 0 {
            return Err(BridgeError::ValueNotSupported(value).into());
        }
        match payload {
            CallPayload::SettleAssertion { .. } => Ok(()),
            CallPayload::Custom { method, .. } => Err(BridgeError::UnsupportedCall(method.clone()).into()),
        }
    }

    fn invoke(
        &mut self,
        caller: &Address,
        _target: &Address,
        payload: &CallPayload,
        value: Amount,
    ) -> Result<(), CallError> {
        self.check(payload, value)?;
        match payload {
            CallPayload::SettleAssertion { question_id, .. } => Ok(self.settle(caller, question_id)?),
            CallPayload::Custom { method, .. } => Err(BridgeError::UnsupportedCall(method.clone()).into()),
        }
    }
}
