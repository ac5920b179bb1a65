/// Funds Ledger
///
/// Native value balances for every address: user wallets, the market engine
/// escrow, the quorum wallet. Value only moves through `deposit` (dev
/// faucet / genesis funding) and `transfer`; every movement is recorded.
///
/// The ledger is a cloneable handle: the market engine and the application
/// state hold the same underlying book.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::accounts::Address;
use crate::clock::Timestamp;
use crate::market_resolve::MarketId;

// ============================================================================
// AMOUNTS
// ============================================================================

/// Value in base units
pub type Amount = u64;

/// Base units per whole unit
pub const UNIT: Amount = 1_000_000;

/// `n` whole units in base units
pub const fn units(n: u64) -> Amount {
    n * UNIT
}

/// `amount * numerator / denominator`, floored, computed in u128.
/// Returns `None` when `denominator` is zero or the result overflows.
pub fn mul_div(amount: Amount, numerator: Amount, denominator: Amount) -> Option<Amount> {
    if denominator == 0 {
        return None;
    }
    let wide = (amount as u128) * (numerator as u128) / (denominator as u128);
    Amount::try_from(wide).ok()
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds for {address}: available {available}, requested {requested}")]
    InsufficientFunds {
        address: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("amount must be positive")]
    ZeroAmount,

    #[error("balance overflow for {0}")]
    Overflow(Address),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientFunds { .. } => "InsufficientFunds",
            LedgerError::ZeroAmount => "ZeroAmount",
            LedgerError::Overflow(_) => "Overflow",
        }
    }
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Deposit,
    Transfer,
    LiquidityAdded,
    SharePurchase,
    Payout,
    LiquidityWithdrawn,
}

/// One recorded value movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub from: Option<Address>,
    pub to: Address,
    pub amount: Amount,
    pub market_id: Option<MarketId>,
    pub timestamp: Timestamp,
}

impl Transaction {
    fn new(tx_type: TxType, from: Option<&Address>, to: &Address, amount: Amount, timestamp: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            from: from.cloned(),
            to: to.clone(),
            amount,
            market_id: None,
            timestamp,
        }
    }
}

/// Aggregate view for the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub accounts: usize,
    pub transactions: usize,
    pub total_supply: Amount,
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Default)]
struct Book {
    balances: HashMap<Address, Amount>,
    transactions: Vec<Transaction>,
    total_supply: Amount,
}

/// Shared handle to the funds book
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    book: Arc<RwLock<Book>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Book> {
        self.book.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Book> {
        self.book.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.read().balances.get(address).copied().unwrap_or(0)
    }

    /// Create value out of thin air (genesis funding, dev faucet)
    pub fn deposit(&self, to: &Address, amount: Amount, now: Timestamp) -> Result<Amount, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let mut book = self.write();
        let current = book.balances.get(to).copied().unwrap_or(0);
        let new_balance = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
        let new_supply = book
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
        book.balances.insert(to.clone(), new_balance);
        book.total_supply = new_supply;
        book.transactions.push(Transaction::new(TxType::Deposit, None, to, amount, now));
        tracing::info!(to = %to.short(), amount, "📥 deposit");
        Ok(new_balance)
    }

    /// Move value between two addresses. Fails without side effects if the
    /// sender cannot cover `amount`.
    pub fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
        tx_type: TxType,
        market_id: Option<MarketId>,
        now: Timestamp,
    ) -> Result<Transaction, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let mut book = self.write();
        let available = book.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                address: from.clone(),
                available,
                requested: amount,
            });
        }
        if from != to {
            let receiver = book.balances.get(to).copied().unwrap_or(0);
            let credited = receiver
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
            book.balances.insert(from.clone(), available - amount);
            book.balances.insert(to.clone(), credited);
        }

        let mut tx = Transaction::new(tx_type, Some(from), to, amount, now);
        tx.market_id = market_id;
        book.transactions.push(tx.clone());
        tracing::debug!(from = %from.short(), to = %to.short(), amount, ?tx_type, "💸 transfer");
        Ok(tx)
    }

    /// Transactions touching an address, oldest first
    pub fn transactions_for(&self, address: &Address) -> Vec<Transaction> {
        self.read()
            .transactions
            .iter()
            .filter(|tx| &tx.to == address || tx.from.as_ref() == Some(address))
            .cloned()
            .collect()
    }

    pub fn recent_transactions(&self, limit: usize) -> Vec<Transaction> {
        self.read().transactions.iter().rev().take(limit).cloned().collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let book = self.read();
        LedgerStats {
            accounts: book.balances.len(),
            transactions: book.transactions.len(),
            total_supply: book.total_supply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::contract(label)
    }

    #[test]
    fn test_units() {
        assert_eq!(units(100), 100_000_000);
        assert_eq!(mul_div(units(10), 9_500, 10_000), Some(9_500_000));
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn test_deposit_and_transfer() {
        let ledger = Ledger::new();
        let alice = addr("alice");
        let bob = addr("bob");

        ledger.deposit(&alice, units(100), 1).unwrap();
        ledger
            .transfer(&alice, &bob, units(40), TxType::Transfer, None, 2)
            .unwrap();

        assert_eq!(ledger.balance(&alice), units(60));
        assert_eq!(ledger.balance(&bob), units(40));
        assert_eq!(ledger.stats().total_supply, units(100));
        assert_eq!(ledger.transactions_for(&bob).len(), 1);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances_untouched() {
        let ledger = Ledger::new();
        let alice = addr("alice");
        let bob = addr("bob");
        ledger.deposit(&alice, units(5), 1).unwrap();

        let err = ledger
            .transfer(&alice, &bob, units(6), TxType::Transfer, None, 2)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance(&alice), units(5));
        assert_eq!(ledger.balance(&bob), 0);
        assert_eq!(ledger.stats().transactions, 1);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let ledger = Ledger::new();
        assert_eq!(ledger.deposit(&addr("a"), 0, 0), Err(LedgerError::ZeroAmount));
    }

    #[test]
    fn test_clones_share_the_book() {
        let ledger = Ledger::new();
        let handle = ledger.clone();
        handle.deposit(&addr("carol"), 7, 0).unwrap();
        assert_eq!(ledger.balance(&addr("carol")), 7);
    }
}
