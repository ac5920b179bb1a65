use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::pricing::Pools;
use crate::accounts::Address;
use crate::clock::Timestamp;
use crate::ledger::Amount;
use crate::oracle::QuestionId;
use crate::shares::ShareClassId;

/// Binary Prediction Market
/// Markets, sides, lifecycle states and the persisted record layout

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub u64);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SIDE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    /// The side that wins for a given oracle verdict
    pub fn from_outcome(outcome: bool) -> Side {
        if outcome {
            Side::Yes
        } else {
            Side::No
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Side::Yes),
            "no" | "false" => Ok(Side::No),
            other => Err(format!("unknown side: {}", other)),
        }
    }
}

// ============================================================================
// MARKET STATE
// ============================================================================

/// Lifecycle: Open → AssertionPending → Resolved. Nothing leaves Resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketState {
    /// Trading and liquidity provision allowed until the end time
    Open,
    /// Question handed to the resolution bridge, waiting for the verdict
    AssertionPending,
    /// Outcome fixed; payouts, withdrawals and burns allowed
    Resolved,
}

impl MarketState {
    /// Position of the state in the record layout
    pub fn index(&self) -> u8 {
        match self {
            MarketState::Open => 0,
            MarketState::AssertionPending => 1,
            MarketState::Resolved => 2,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MarketState::Open => "🟢",
            MarketState::AssertionPending => "⏳",
            MarketState::Resolved => "✅",
        }
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            MarketState::Open => "open",
            MarketState::AssertionPending => "assertion_pending",
            MarketState::Resolved => "resolved",
        };
        write!(f, "{}", state)
    }
}

// ============================================================================
// SETTLEMENT
// ============================================================================

/// Pots frozen when the market resolves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Winning shares in circulation at resolution
    pub winning_supply: Amount,
    /// Value backing the winning shares (the winning pool)
    pub winners_pot: Amount,
    /// Pool value owed to liquidity providers
    pub lp_pool_pot: Amount,
    /// Trading fees owed to liquidity providers
    pub fee_pot: Amount,
    /// Sum of contributions not yet withdrawn
    pub liquidity_outstanding: Amount,
    pub lp_pool_paid: Amount,
    pub fees_paid: Amount,
}

// ============================================================================
// POSITIONS
// ============================================================================

/// Per-holder bookkeeping kept by the engine. Share balances themselves
/// live in the share ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Total paid into the market for shares, fees included
    pub spent: Amount,
    pub claimed: bool,
}

/// Read model combining the engine record with share ledger balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub market_id: MarketId,
    pub holder: Address,
    pub yes_shares: Amount,
    pub no_shares: Amount,
    pub spent: Amount,
    pub claimed: bool,
    /// Outstanding liquidity contribution
    pub liquidity: Amount,
}

// ============================================================================
// MARKET
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,

    /// The question the oracle will be asked
    pub question: String,

    /// Trading stops at this time; assertion is allowed from it on
    pub end_time: Timestamp,

    pub state: MarketState,

    pub pools: Pools,

    /// Sum of all liquidity contributions
    pub total_liquidity: Amount,

    pub yes_class: ShareClassId,
    pub no_class: ShareClassId,

    /// Oracle verdict (None until resolved)
    pub outcome: Option<bool>,

    /// Fees collected from trades and not yet withdrawn
    pub fee_accrued: Amount,

    /// Fee rate fixed at creation
    pub fee_rate_bps: u32,

    pub created_at: Timestamp,
    pub creator: Address,

    /// Assigned by the oracle on assertion
    pub question_id: Option<QuestionId>,

    /// Provider → contribution (zeroed on withdrawal)
    pub liquidity_providers: BTreeMap<Address, Amount>,

    pub positions: BTreeMap<Address, PositionRecord>,

    /// Frozen at resolution
    pub settlement: Option<Settlement>,
}

impl Market {
    pub fn class_for(&self, side: Side) -> ShareClassId {
        match side {
            Side::Yes => self.yes_class,
            Side::No => self.no_class,
        }
    }

    pub fn winning_side(&self) -> Option<Side> {
        self.outcome.map(Side::from_outcome)
    }

    pub fn is_trading_open(&self, now: Timestamp) -> bool {
        self.state == MarketState::Open && now < self.end_time
    }

    pub fn record(&self) -> MarketRecord {
        MarketRecord(
            self.id,
            self.question.clone(),
            self.end_time,
            self.state.index(),
            self.pools.yes,
            self.pools.no,
            self.total_liquidity,
            self.yes_class,
            self.no_class,
            self.outcome.unwrap_or(false),
            self.fee_accrued,
        )
    }
}

/// Positional market record read by external indexers:
/// `[id, question, endTime, state, yesPool, noPool, totalLiquidity,
///   yesShareClass, noShareClass, outcome, feeAccrued]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRecord(
    pub MarketId,
    pub String,
    pub Timestamp,
    pub u8,
    pub Amount,
    pub Amount,
    pub Amount,
    pub ShareClassId,
    pub ShareClassId,
    pub bool,
    pub Amount,
);
