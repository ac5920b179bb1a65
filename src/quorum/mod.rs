// ============================================================================
// Quorum Wallet - n-of-m Signed Execution with Cooldown
// ============================================================================
//
// Stages calls (transactions), collects signer approvals and executes each
// transaction exactly once, after the quorum is reached AND the cooldown
// since creation has elapsed.
//
// Flow:
//   propose_transaction → sign_transaction (×threshold) → wait cooldown
//   → execute_transaction → CallTarget::invoke
//
// The `executed` flag is committed before the target is invoked; a failed
// call reverts it so the transaction may be retried.
//
// A proposal is refused unless the call dispatcher accepts its target,
// payload and value.
// ============================================================================

pub mod transaction;

pub use transaction::{CallError, CallPayload, CallTarget, QuorumTransaction, TxId};

use std::collections::{BTreeMap, BTreeSet};

use crate::accounts::Address;
use crate::clock::{SharedClock, Timestamp, ONE_DAY};
use crate::events::{Event, EventLog};
use crate::ledger::Amount;

/// Seven days
pub const DEFAULT_COOLDOWN_SECS: u64 = 7 * ONE_DAY;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub signers: Vec<Address>,
    /// `None` means every signer must approve
    pub threshold: Option<usize>,
    pub cooldown_secs: u64,
    /// Non-signers allowed to stage transactions (the resolution bridge)
    pub proposers: Vec<Address>,
}

impl WalletConfig {
    pub fn new(signers: Vec<Address>) -> Self {
        Self {
            signers,
            threshold: None,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            proposers: Vec::new(),
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_cooldown(mut self, cooldown_secs: u64) -> Self {
        self.cooldown_secs = cooldown_secs;
        self
    }

    pub fn with_proposer(mut self, proposer: Address) -> Self {
        self.proposers.push(proposer);
        self
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("invalid wallet configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} may not propose transactions")]
    Unauthorized(Address),

    #[error("{0} is not a signer")]
    NotASigner(Address),

    #[error("transaction {0} not found")]
    TransactionNotFound(TxId),

    #[error("transaction {0} already executed")]
    AlreadyExecuted(TxId),

    #[error("{signer} already signed transaction {tx_id}")]
    AlreadySigned { tx_id: TxId, signer: Address },

    #[error("transaction {tx_id} has {signatures} of {threshold} required signatures")]
    QuorumNotMet {
        tx_id: TxId,
        signatures: usize,
        threshold: usize,
    },

    #[error("transaction {tx_id} is cooling down until {ready_at}")]
    CooldownActive { tx_id: TxId, ready_at: Timestamp },

    #[error("no call target for {0}")]
    UnknownTarget(Address),

    #[error("call rejected: {0}")]
    CallRejected(CallError),

    #[error("transaction {tx_id} call failed: {source}")]
    CallFailed { tx_id: TxId, source: CallError },
}

impl WalletError {
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InvalidConfig(_) => "InvalidConfig",
            WalletError::Unauthorized(_) => "Unauthorized",
            WalletError::NotASigner(_) => "NotASigner",
            WalletError::TransactionNotFound(_) => "TransactionNotFound",
            WalletError::AlreadyExecuted(_) => "AlreadyExecuted",
            WalletError::AlreadySigned { .. } => "AlreadySigned",
            WalletError::QuorumNotMet { .. } => "QuorumNotMet",
            WalletError::CooldownActive { .. } => "CooldownActive",
            WalletError::UnknownTarget(_) => "UnknownTarget",
            WalletError::CallRejected(err) => err.code,
            WalletError::CallFailed { .. } => "CallFailed",
        }
    }
}

// ============================================================================
// WALLET
// ============================================================================

#[derive(Debug)]
pub struct QuorumWallet {
    address: Address,
    signers: Vec<Address>,
    threshold: usize,
    cooldown_secs: u64,
    proposers: BTreeSet<Address>,
    transactions: BTreeMap<TxId, QuorumTransaction>,
    next_tx_id: u64,
    clock: SharedClock,
    events: EventLog,
}

impl QuorumWallet {
    pub fn new(
        address: Address,
        config: WalletConfig,
        clock: SharedClock,
        events: EventLog,
    ) -> Result<Self, WalletError> {
        if config.signers.is_empty() {
            return Err(WalletError::InvalidConfig("signer list is empty".into()));
        }
        let unique: BTreeSet<&Address> = config.signers.iter().collect();
        if unique.len() != config.signers.len() {
            return Err(WalletError::InvalidConfig("duplicate signer".into()));
        }
        let threshold = config.threshold.unwrap_or(config.signers.len());
        if threshold == 0 || threshold > config.signers.len() {
            return Err(WalletError::InvalidConfig(format!(
                "threshold {} outside 1..={}",
                threshold,
                config.signers.len()
            )));
        }

        tracing::info!(
            address = %address.short(),
            signers = config.signers.len(),
            threshold,
            cooldown_secs = config.cooldown_secs,
            "🔐 quorum wallet ready"
        );

        Ok(Self {
            address,
            signers: config.signers,
            threshold,
            cooldown_secs: config.cooldown_secs,
            proposers: config.proposers.into_iter().collect(),
            transactions: BTreeMap::new(),
            next_tx_id: 0,
            clock,
            events,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    pub fn is_signer(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }

    pub fn transaction(&self, tx_id: TxId) -> Option<&QuorumTransaction> {
        self.transactions.get(&tx_id)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &QuorumTransaction> {
        self.transactions.values()
    }

    /// Allow an extra non-signer address to stage transactions
    pub fn authorize_proposer(&mut self, proposer: Address) {
        self.proposers.insert(proposer);
    }

    /// Stage a call. Only signers and authorised proposers may do this, and
    /// `dispatcher` must be able to execute it.
    pub fn propose_transaction(
        &mut self,
        caller: &Address,
        target: Address,
        payload: CallPayload,
        value: Amount,
        dispatcher: &dyn CallTarget,
    ) -> Result<TxId, WalletError> {
        if !self.is_signer(caller) && !self.proposers.contains(caller) {
            tracing::warn!(caller = %caller.short(), "rejected proposal from unauthorised caller");
            return Err(WalletError::Unauthorized(caller.clone()));
        }
        if !dispatcher.accepts(&target) {
            return Err(WalletError::UnknownTarget(target));
        }
        if let Err(err) = dispatcher.check(&payload, value) {
            tracing::warn!(caller = %caller.short(), error = %err, "rejected unexecutable proposal");
            return Err(WalletError::CallRejected(err));
        }

        let tx_id = TxId(self.next_tx_id);
        self.next_tx_id += 1;
        let now = self.clock.now();

        let event = Event::TransactionCreated {
            tx_id,
            target_question_id: payload.digest(),
            claim_text: payload.description(),
        };
        self.transactions.insert(
            tx_id,
            QuorumTransaction {
                id: tx_id,
                proposer: caller.clone(),
                target,
                payload,
                value,
                created_at: now,
                signatures: BTreeSet::new(),
                executed: false,
            },
        );
        self.events.emit(&self.address, now, event);
        tracing::info!(%tx_id, proposer = %caller.short(), "📝 transaction proposed");
        Ok(tx_id)
    }

    /// Record the caller's approval, returning the signature count
    pub fn sign_transaction(&mut self, caller: &Address, tx_id: TxId) -> Result<usize, WalletError> {
        if !self.is_signer(caller) {
            tracing::warn!(caller = %caller.short(), %tx_id, "rejected signature from non-signer");
            return Err(WalletError::NotASigner(caller.clone()));
        }
        let tx = self
            .transactions
            .get_mut(&tx_id)
            .ok_or(WalletError::TransactionNotFound(tx_id))?;
        if tx.executed {
            return Err(WalletError::AlreadyExecuted(tx_id));
        }
        if !tx.signatures.insert(caller.clone()) {
            return Err(WalletError::AlreadySigned {
                tx_id,
                signer: caller.clone(),
            });
        }
        let signatures = tx.signature_count();

        self.events.emit(
            &self.address,
            self.clock.now(),
            Event::TransactionSigned {
                tx_id,
                signer: caller.clone(),
                signatures,
            },
        );
        tracing::info!(%tx_id, signer = %caller.short(), signatures, threshold = self.threshold, "✍️ transaction signed");
        Ok(signatures)
    }

    /// Execute a transaction that has reached quorum and cleared its
    /// cooldown. Anyone may call this.
    pub fn execute_transaction(
        &mut self,
        caller: &Address,
        tx_id: TxId,
        target: &mut dyn CallTarget,
    ) -> Result<(), WalletError> {
        let now = self.clock.now();
        let threshold = self.threshold;
        let cooldown_secs = self.cooldown_secs;

        let tx = self
            .transactions
            .get_mut(&tx_id)
            .ok_or(WalletError::TransactionNotFound(tx_id))?;
        if tx.executed {
            return Err(WalletError::AlreadyExecuted(tx_id));
        }
        if tx.signature_count() < threshold {
            return Err(WalletError::QuorumNotMet {
                tx_id,
                signatures: tx.signature_count(),
                threshold,
            });
        }
        let ready_at = tx.ready_at(cooldown_secs);
        if now < ready_at {
            return Err(WalletError::CooldownActive { tx_id, ready_at });
        }
        if !target.accepts(&tx.target) {
            return Err(WalletError::UnknownTarget(tx.target.clone()));
        }
        target.check(&tx.payload, tx.value).map_err(WalletError::CallRejected)?;

        tx.executed = true;
        if let Err(source) = target.invoke(&self.address, &tx.target, &tx.payload, tx.value) {
            tx.executed = false;
            tracing::warn!(%tx_id, error = %source, "transaction call failed, execution reverted");
            return Err(WalletError::CallFailed { tx_id, source });
        }

        self.events.emit(
            &self.address,
            now,
            Event::TransactionExecuted {
                tx_id,
                executor: caller.clone(),
            },
        );
        tracing::info!(%tx_id, executor = %caller.short(), "✅ transaction executed");
        Ok(())
    }
}
