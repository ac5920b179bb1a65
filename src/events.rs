//! # events
//!
//! Append-only event log. Components write to it, external indexers read
//! from it; nothing in the core reads it back for control flow.
//!
//! Field order inside each variant is part of the contract with indexers.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use crate::accounts::Address;
use crate::clock::Timestamp;
use crate::ledger::Amount;
use crate::market_resolve::{MarketId, Side};
use crate::oracle::QuestionId;
use crate::quorum::TxId;

/// Every externally observable event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum Event {
    MarketCreated {
        market_id: MarketId,
        question: String,
    },
    LiquidityAdded {
        market_id: MarketId,
        provider: Address,
        amount: Amount,
    },
    SharesPurchased {
        market_id: MarketId,
        buyer: Address,
        side: Side,
        amount: Amount,
        fee: Amount,
        shares: Amount,
    },
    MarketAsserted {
        market_id: MarketId,
        question_id: QuestionId,
    },
    MarketResolved {
        market_id: MarketId,
        outcome: bool,
    },
    PayoutClaimed {
        market_id: MarketId,
        claimer: Address,
        amount: Amount,
    },
    LiquidityWithdrawn {
        market_id: MarketId,
        provider: Address,
        amount: Amount,
    },
    SharesBurned {
        market_id: MarketId,
        yes_burned: Amount,
        no_burned: Amount,
    },
    AssertionCreated {
        question_id: QuestionId,
        assertor: Address,
    },
    AssertionSettled {
        question_id: QuestionId,
        result: bool,
    },
    TransactionCreated {
        tx_id: TxId,
        target_question_id: QuestionId,
        claim_text: String,
    },
    TransactionSigned {
        tx_id: TxId,
        signer: Address,
        signatures: usize,
    },
    TransactionExecuted {
        tx_id: TxId,
        executor: Address,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::MarketCreated { .. } => "MarketCreated",
            Event::LiquidityAdded { .. } => "LiquidityAdded",
            Event::SharesPurchased { .. } => "SharesPurchased",
            Event::MarketAsserted { .. } => "MarketAsserted",
            Event::MarketResolved { .. } => "MarketResolved",
            Event::PayoutClaimed { .. } => "PayoutClaimed",
            Event::LiquidityWithdrawn { .. } => "LiquidityWithdrawn",
            Event::SharesBurned { .. } => "SharesBurned",
            Event::AssertionCreated { .. } => "AssertionCreated",
            Event::AssertionSettled { .. } => "AssertionSettled",
            Event::TransactionCreated { .. } => "TransactionCreated",
            Event::TransactionSigned { .. } => "TransactionSigned",
            Event::TransactionExecuted { .. } => "TransactionExecuted",
        }
    }
}

/// One stamped entry in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub emitter: Address,
    pub recorded_at: Timestamp,
    #[serde(flatten)]
    pub event: Event,
}

/// Shared handle to the append-only log. Clones write to the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn emit(&self, emitter: &Address, recorded_at: Timestamp, event: Event) -> u64 {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let seq = entries.len() as u64;
        tracing::debug!(seq, emitter = %emitter.short(), event = event.name(), "event emitted");
        entries.push(LogEntry {
            seq,
            emitter: emitter.clone(),
            recorded_at,
            event,
        });
        seq
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries with `seq >= since`
    pub fn since(&self, since: u64) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().skip(since as usize).cloned().collect()
    }

    pub fn all(&self) -> Vec<LogEntry> {
        self.since(0)
    }

    /// Events matching a predicate, in emission order
    pub fn filter<F>(&self, predicate: F) -> Vec<Event>
    where
        F: Fn(&Event) -> bool,
    {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|entry| predicate(&entry.event))
            .map(|entry| entry.event.clone())
            .collect()
    }

    /// Events with the given name, in emission order
    pub fn named(&self, name: &str) -> Vec<Event> {
        self.filter(|event| event.name() == name)
    }
}
