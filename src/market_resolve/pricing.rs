use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::markets::Side;
use crate::ledger::{mul_div, Amount};

/// Basis-point denominator for fee rates
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default trading fee: 5%
pub const DEFAULT_FEE_RATE_BPS: u32 = 500;

// ============================================================================
// POOLS
// ============================================================================

/// The two outcome pools of a binary market
///
/// Pricing is a pool ratio:
///   Price(YES) = YES_pool / (YES_pool + NO_pool)
///   Price(NO)  = NO_pool / (YES_pool + NO_pool)
/// Buying a side grows its pool, so its price rises with demand. Both prices
/// sit strictly inside (0, 1) while both pools are non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pools {
    pub yes: Amount,
    pub no: Amount,
}

/// Breakdown of a share purchase at the pre-trade price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Fee taken out of the paid amount
    pub fee: Amount,
    /// Amount added to the chosen side's pool
    pub net: Amount,
    /// Shares minted to the buyer
    pub shares: Amount,
}

impl Pools {
    pub fn new(yes: Amount, no: Amount) -> Self {
        Self { yes, no }
    }

    pub fn total(&self) -> Amount {
        self.yes.saturating_add(self.no)
    }

    pub fn side(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.yes,
            Side::No => &mut self.no,
        }
    }

    pub fn is_liquid(&self) -> bool {
        self.yes > 0 && self.no > 0
    }

    /// Current price of one share of `side`; 1/2 when both pools are empty
    pub fn price(&self, side: Side) -> Decimal {
        let total = self.total();
        if total == 0 {
            return Decimal::new(5, 1);
        }
        Decimal::from(self.side(side)) / Decimal::from(total)
    }

    /// Split a liquidity deposit across the pools. The odd base unit goes to NO.
    pub fn split_liquidity(amount: Amount) -> (Amount, Amount) {
        let yes = amount / 2;
        (yes, amount - yes)
    }

    /// Quote buying `side` with `amount`, fee included.
    ///
    /// shares = net / price(side) = net * (YES + NO) / pool(side), floored.
    /// Returns `None` when the pools are not both funded or the math overflows.
    pub fn quote(&self, side: Side, amount: Amount, fee_rate_bps: u32) -> Option<Quote> {
        if !self.is_liquid() {
            return None;
        }
        let fee = mul_div(amount, fee_rate_bps as Amount, BPS_DENOMINATOR as Amount)?;
        let net = amount.checked_sub(fee)?;
        let shares = mul_div(net, self.total(), self.side(side))?;
        Some(Quote { fee, net, shares })
    }

    /// Pools after a purchase has been applied
    pub fn after(&self, side: Side, quote: &Quote) -> Option<Pools> {
        let mut next = *self;
        let pool = next.side_mut(side);
        *pool = pool.checked_add(quote.net)?;
        Some(next)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
