// ============================================================================
// Shares Module - Outcome Share Ledger
// ============================================================================
//
// Semi-fungible share balances for the two outcome classes of every market.
// Each market owns a YES class and a NO class; a class id is an opaque
// identifier into this ledger's namespace.
//
// The market engine talks to the ledger only through the `ShareLedger`
// trait. `SharesManager` is the in-memory implementation used by the
// server and the tests.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::accounts::Address;
use crate::ledger::Amount;

// ============================================================================
// SHARE CLASS
// ============================================================================

/// Identifier of one share class (one side of one market)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareClassId(pub u64);

impl fmt::Display for ShareClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    #[error("unknown share class {0}")]
    UnknownClass(ShareClassId),

    #[error("insufficient shares of class {class} for {holder}: have {available}, need {requested}")]
    InsufficientShares {
        holder: Address,
        class: ShareClassId,
        available: Amount,
        requested: Amount,
    },

    #[error("share supply overflow for class {0}")]
    Overflow(ShareClassId),
}

impl ShareError {
    pub fn code(&self) -> &'static str {
        match self {
            ShareError::UnknownClass(_) => "UnknownShareClass",
            ShareError::InsufficientShares { .. } => "InsufficientShares",
            ShareError::Overflow(_) => "Overflow",
        }
    }
}

// ============================================================================
// SHARE LEDGER INTERFACE
// ============================================================================

/// Minimum surface the market engine needs from a share ledger
pub trait ShareLedger: Send + Sync + fmt::Debug {
    /// Allocate a fresh (YES, NO) class pair
    fn create_class_pair(&self) -> (ShareClassId, ShareClassId);

    fn mint(&self, holder: &Address, class: ShareClassId, qty: Amount) -> Result<(), ShareError>;

    fn burn(&self, holder: &Address, class: ShareClassId, qty: Amount) -> Result<(), ShareError>;

    /// Burn the holder's whole balance of `class`, returning how much was burned
    fn burn_all(&self, holder: &Address, class: ShareClassId) -> Result<Amount, ShareError> {
        let balance = self.balance_of(holder, class);
        if balance > 0 {
            self.burn(holder, class, balance)?;
        }
        Ok(balance)
    }

    fn transfer(&self, from: &Address, to: &Address, class: ShareClassId, qty: Amount) -> Result<(), ShareError>;

    fn balance_of(&self, holder: &Address, class: ShareClassId) -> Amount;

    fn total_supply(&self, class: ShareClassId) -> Amount;
}

// ============================================================================
// SHARES MANAGER
// ============================================================================

#[derive(Debug, Default)]
struct ShareBook {
    next_class: u64,
    balances: HashMap<(ShareClassId, Address), Amount>,
    total_supply: HashMap<ShareClassId, Amount>,
}

impl ShareBook {
    fn known(&self, class: ShareClassId) -> Result<(), ShareError> {
        if self.total_supply.contains_key(&class) {
            Ok(())
        } else {
            Err(ShareError::UnknownClass(class))
        }
    }

    fn balance(&self, holder: &Address, class: ShareClassId) -> Amount {
        self.balances.get(&(class, holder.clone())).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, holder: &Address, class: ShareClassId, balance: Amount) {
        if balance == 0 {
            self.balances.remove(&(class, holder.clone()));
        } else {
            self.balances.insert((class, holder.clone()), balance);
        }
    }
}

/// In-memory share ledger. Cloneable handle; clones share the same book.
#[derive(Debug, Clone, Default)]
pub struct SharesManager {
    book: Arc<RwLock<ShareBook>>,
}

impl SharesManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ShareBook> {
        self.book.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShareBook> {
        self.book.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Holders with a non-zero balance of `class`
    pub fn holders(&self, class: ShareClassId) -> Vec<(Address, Amount)> {
        let mut holders: Vec<(Address, Amount)> = self
            .read()
            .balances
            .iter()
            .filter(|((c, _), _)| *c == class)
            .map(|((_, holder), qty)| (holder.clone(), *qty))
            .collect();
        holders.sort();
        holders
    }
}

impl ShareLedger for SharesManager {
    fn create_class_pair(&self) -> (ShareClassId, ShareClassId) {
        let mut book = self.write();
        let yes = ShareClassId(book.next_class);
        let no = ShareClassId(book.next_class + 1);
        book.next_class += 2;
        book.total_supply.insert(yes, 0);
        book.total_supply.insert(no, 0);
        (yes, no)
    }

    fn mint(&self, holder: &Address, class: ShareClassId, qty: Amount) -> Result<(), ShareError> {
        let mut book = self.write();
        book.known(class)?;
        let supply = book.total_supply.get(&class).copied().unwrap_or(0);
        let new_supply = supply.checked_add(qty).ok_or(ShareError::Overflow(class))?;
        let new_balance = book
            .balance(holder, class)
            .checked_add(qty)
            .ok_or(ShareError::Overflow(class))?;
        book.total_supply.insert(class, new_supply);
        book.set_balance(holder, class, new_balance);
        tracing::debug!(holder = %holder.short(), %class, qty, "🪙 shares minted");
        Ok(())
    }

    fn burn(&self, holder: &Address, class: ShareClassId, qty: Amount) -> Result<(), ShareError> {
        let mut book = self.write();
        book.known(class)?;
        let available = book.balance(holder, class);
        if available < qty {
            return Err(ShareError::InsufficientShares {
                holder: holder.clone(),
                class,
                available,
                requested: qty,
            });
        }
        let supply = book.total_supply.get(&class).copied().unwrap_or(0);
        book.total_supply.insert(class, supply.saturating_sub(qty));
        book.set_balance(holder, class, available - qty);
        tracing::debug!(holder = %holder.short(), %class, qty, "🔥 shares burned");
        Ok(())
    }

    fn transfer(&self, from: &Address, to: &Address, class: ShareClassId, qty: Amount) -> Result<(), ShareError> {
        let mut book = self.write();
        book.known(class)?;
        let available = book.balance(from, class);
        if available < qty {
            return Err(ShareError::InsufficientShares {
                holder: from.clone(),
                class,
                available,
                requested: qty,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = book
            .balance(to, class)
            .checked_add(qty)
            .ok_or(ShareError::Overflow(class))?;
        book.set_balance(from, class, available - qty);
        book.set_balance(to, class, credited);
        Ok(())
    }

    fn balance_of(&self, holder: &Address, class: ShareClassId) -> Amount {
        self.read().balance(holder, class)
    }

    fn total_supply(&self, class: ShareClassId) -> Amount {
        self.read().total_supply.get(&class).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(name: &str) -> Address {
        Address::contract(name)
    }

    #[test]
    fn test_class_pairs_are_fresh() {
        let shares = SharesManager::new();
        let (yes_a, no_a) = shares.create_class_pair();
        let (yes_b, no_b) = shares.create_class_pair();
        assert_ne!(yes_a, no_a);
        assert_ne!(yes_a, yes_b);
        assert_ne!(no_a, no_b);
    }

    #[test]
    fn test_mint_and_burn_track_supply() {
        let shares = SharesManager::new();
        let (yes, _) = shares.create_class_pair();
        let alice = holder("alice");

        shares.mint(&alice, yes, 100).unwrap();
        shares.mint(&holder("bob"), yes, 50).unwrap();
        assert_eq!(shares.total_supply(yes), 150);

        shares.burn(&alice, yes, 30).unwrap();
        assert_eq!(shares.balance_of(&alice, yes), 70);
        assert_eq!(shares.total_supply(yes), 120);
    }

    #[test]
    fn test_burn_more_than_balance_fails() {
        let shares = SharesManager::new();
        let (yes, _) = shares.create_class_pair();
        let alice = holder("alice");
        shares.mint(&alice, yes, 10).unwrap();

        let err = shares.burn(&alice, yes, 11).unwrap_err();
        assert!(matches!(err, ShareError::InsufficientShares { available: 10, .. }));
        assert_eq!(shares.balance_of(&alice, yes), 10);
    }

    #[test]
    fn test_burn_all_clears_balance() {
        let shares = SharesManager::new();
        let (_, no) = shares.create_class_pair();
        let alice = holder("alice");
        shares.mint(&alice, no, 42).unwrap();

        assert_eq!(shares.burn_all(&alice, no).unwrap(), 42);
        assert_eq!(shares.burn_all(&alice, no).unwrap(), 0);
        assert_eq!(shares.total_supply(no), 0);
        assert!(shares.holders(no).is_empty());
    }

    #[test]
    fn test_unknown_class_rejected() {
        let shares = SharesManager::new();
        let err = shares.mint(&holder("x"), ShareClassId(99), 1).unwrap_err();
        assert_eq!(err, ShareError::UnknownClass(ShareClassId(99)));
    }

    #[test]
    fn test_transfer_keeps_supply() {
        let shares = SharesManager::new();
        let (yes, _) = shares.create_class_pair();
        let alice = holder("alice");
        let bob = holder("bob");
        shares.mint(&alice, yes, 10).unwrap();

        shares.transfer(&alice, &bob, yes, 4).unwrap();
        assert_eq!(shares.balance_of(&alice, yes), 6);
        assert_eq!(shares.balance_of(&bob, yes), 4);
        assert_eq!(shares.total_supply(yes), 10);
        assert_eq!(shares.holders(yes).len(), 2);
    }
}
