// ============================================================================
// Market Engine - Binary Market Lifecycle
// ============================================================================
//
// Owns every market: liquidity, trading, assertion, resolution, payouts,
// liquidity withdrawal and share burning. Funds sit in the engine escrow on
// the funds ledger; outcome shares live in the share ledger.
//
// State flags (claimed, withdrawn, state transitions) are committed before
// value leaves escrow; a failing transfer rolls them back.
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::markets::{Market, MarketId, MarketRecord, MarketState, Position, PositionRecord, Settlement, Side};
use super::pricing::{Pools, BPS_DENOMINATOR, DEFAULT_FEE_RATE_BPS};
use crate::accounts::Address;
use crate::bridge::{AssertionTicket, BridgeError, ResolutionBridge};
use crate::clock::{SharedClock, Timestamp};
use crate::events::{Event, EventLog};
use crate::ledger::{mul_div, Amount, Ledger, LedgerError, TxType};
use crate::oracle::TruthOracle;
use crate::quorum::QuorumWallet;
use crate::shares::{ShareClassId, ShareError, ShareLedger};

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// May burn residual shares
    pub owner: Address,
    /// The engine's own address: holds market funds, asserts questions
    pub escrow: Address,
    pub fee_rate_bps: u32,
}

impl EngineConfig {
    pub fn new(owner: Address, escrow: Address) -> Self {
        Self {
            owner,
            escrow,
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
        }
    }

    pub fn with_fee_rate(mut self, fee_rate_bps: u32) -> Self {
        self.fee_rate_bps = fee_rate_bps;
        self
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("market {market_id} is {state}")]
    InvalidState { market_id: MarketId, state: MarketState },

    #[error("market {0} is closed for trading")]
    MarketClosed(MarketId),

    #[error("market {market_id} runs until {end_time}")]
    MarketNotEnded { market_id: MarketId, end_time: Timestamp },

    #[error("market {0} already asserted")]
    AlreadyAsserted(MarketId),

    #[error("market {0} outcome not settled yet")]
    NotSettled(MarketId),

    #[error("{holder} already claimed on market {market_id}")]
    AlreadyClaimed { market_id: MarketId, holder: Address },

    #[error("{holder} holds no winning shares on market {market_id}")]
    NothingToClaim { market_id: MarketId, holder: Address },

    #[error("{provider} already withdrew from market {market_id}")]
    AlreadyWithdrawn { market_id: MarketId, provider: Address },

    #[error("{0} is not authorized for this operation")]
    Unauthorized(Address),

    #[error("market {0} has no liquidity")]
    NoLiquidity(MarketId),

    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("duration must be positive")]
    InvalidDuration,

    #[error("amount must be positive")]
    ZeroAmount,

    #[error("amount too small to buy a share")]
    AmountTooSmall,

    #[error("market {0} pools cannot cover this payment")]
    PoolExhausted(MarketId),

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Shares(#[from] ShareError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl MarketError {
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::InvalidConfig(_) => "InvalidConfig",
            MarketError::MarketNotFound(_) => "MarketNotFound",
            MarketError::InvalidState { .. } => "InvalidState",
            MarketError::MarketClosed(_) => "MarketClosed",
            MarketError::MarketNotEnded { .. } => "MarketNotEnded",
            MarketError::AlreadyAsserted(_) => "AlreadyAsserted",
            MarketError::NotSettled(_) => "NotSettled",
            MarketError::AlreadyClaimed { .. } => "AlreadyClaimed",
            MarketError::NothingToClaim { .. } => "NothingToClaim",
            MarketError::AlreadyWithdrawn { .. } => "AlreadyWithdrawn",
            MarketError::Unauthorized(_) => "Unauthorized",
            MarketError::NoLiquidity(_) => "NoLiquidity",
            MarketError::EmptyQuestion => "EmptyQuestion",
            MarketError::InvalidDuration => "InvalidDuration",
            MarketError::ZeroAmount => "ZeroAmount",
            MarketError::AmountTooSmall => "AmountTooSmall",
            MarketError::PoolExhausted(_) => "PoolExhausted",
            MarketError::Overflow => "Overflow",
            MarketError::Ledger(err) => err.code(),
            MarketError::Shares(err) => err.code(),
            MarketError::Bridge(err) => err.code(),
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub market_id: MarketId,
    pub buyer: Address,
    pub side: Side,
    pub amount: Amount,
    pub fee: Amount,
    pub net: Amount,
    pub shares: Amount,
    pub price_before: Decimal,
    pub price_after: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnReport {
    pub market_id: MarketId,
    pub yes_burned: Amount,
    pub no_burned: Amount,
}

// ============================================================================
// MARKET ENGINE
// ============================================================================

#[derive(Debug)]
pub struct MarketEngine {
    config: EngineConfig,
    markets: BTreeMap<MarketId, Market>,
    next_market_id: u64,
    shares: Arc<dyn ShareLedger>,
    ledger: Ledger,
    events: EventLog,
    clock: SharedClock,
}

fn invalid_state(market: &Market) -> MarketError {
    MarketError::InvalidState {
        market_id: market.id,
        state: market.state,
    }
}

/// Burn each `(class, qty)`; on failure re-mint whatever was already burned
fn burn_exact(shares: &dyn ShareLedger, holder: &Address, burns: &[(ShareClassId, Amount)]) -> Result<(), ShareError> {
    for (done, (class, qty)) in burns.iter().enumerate() {
        if *qty == 0 {
            continue;
        }
        if let Err(err) = shares.burn(holder, *class, *qty) {
            remint(shares, holder, &burns[..done]);
            return Err(err);
        }
    }
    Ok(())
}

fn remint(shares: &dyn ShareLedger, holder: &Address, burns: &[(ShareClassId, Amount)]) {
    for (class, qty) in burns.iter().filter(|(_, qty)| *qty > 0) {
        if let Err(err) = shares.mint(holder, *class, *qty) {
            tracing::error!(holder = %holder.short(), %class, qty, error = %err, "failed to restore burned shares");
        }
    }
}

impl MarketEngine {
    pub fn new(
        config: EngineConfig,
        shares: Arc<dyn ShareLedger>,
        ledger: Ledger,
        events: EventLog,
        clock: SharedClock,
    ) -> Result<Self, MarketError> {
        if config.fee_rate_bps > BPS_DENOMINATOR {
            return Err(MarketError::InvalidConfig(format!(
                "fee rate {} bps exceeds {}",
                config.fee_rate_bps, BPS_DENOMINATOR
            )));
        }
        tracing::info!(
            escrow = %config.escrow.short(),
            owner = %config.owner.short(),
            fee_rate_bps = config.fee_rate_bps,
            "🎲 market engine ready"
        );
        Ok(Self {
            config,
            markets: BTreeMap::new(),
            next_market_id: 0,
            shares,
            ledger,
            events,
            clock,
        })
    }

    pub fn escrow(&self) -> &Address {
        &self.config.escrow
    }

    pub fn owner(&self) -> &Address {
        &self.config.owner
    }

    pub fn fee_rate_bps(&self) -> u32 {
        self.config.fee_rate_bps
    }

    fn emit(&self, event: Event) {
        self.events.emit(&self.config.escrow, self.clock.now(), event);
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn market(&self, market_id: MarketId) -> Option<&Market> {
        self.markets.get(&market_id)
    }

    pub fn markets(&self) -> Vec<&Market> {
        self.markets.values().collect()
    }

    pub fn record(&self, market_id: MarketId) -> Option<MarketRecord> {
        self.markets.get(&market_id).map(Market::record)
    }

    pub fn position(&self, market_id: MarketId, holder: &Address) -> Option<Position> {
        let market = self.markets.get(&market_id)?;
        let record = market.positions.get(holder).copied().unwrap_or_default();
        Some(Position {
            market_id,
            holder: holder.clone(),
            yes_shares: self.shares.balance_of(holder, market.yes_class),
            no_shares: self.shares.balance_of(holder, market.no_class),
            spent: record.spent,
            claimed: record.claimed,
            liquidity: market.liquidity_providers.get(holder).copied().unwrap_or(0),
        })
    }

    /// Current price of one `side` share
    pub fn get_price(&self, market_id: MarketId, side: Side) -> Result<Decimal, MarketError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        Ok(market.pools.price(side))
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    pub fn create_market(&mut self, caller: &Address, question: &str, duration_secs: u64) -> Result<MarketId, MarketError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(MarketError::EmptyQuestion);
        }
        if duration_secs == 0 {
            return Err(MarketError::InvalidDuration);
        }
        let now = self.clock.now();
        let end_time = now.checked_add(duration_secs).ok_or(MarketError::InvalidDuration)?;

        let (yes_class, no_class) = self.shares.create_class_pair();
        let market_id = MarketId(self.next_market_id);
        self.next_market_id += 1;

        self.markets.insert(
            market_id,
            Market {
                id: market_id,
                question: question.to_string(),
                end_time,
                state: MarketState::Open,
                pools: Pools::default(),
                total_liquidity: 0,
                yes_class,
                no_class,
                outcome: None,
                fee_accrued: 0,
                fee_rate_bps: self.config.fee_rate_bps,
                created_at: now,
                creator: caller.clone(),
                question_id: None,
                liquidity_providers: BTreeMap::new(),
                positions: BTreeMap::new(),
                settlement: None,
            },
        );
        self.emit(Event::MarketCreated {
            market_id,
            question: question.to_string(),
        });
        tracing::info!(%market_id, creator = %caller.short(), end_time, "🆕 market created: {}", question);
        Ok(market_id)
    }

    /// Fund both pools. Returns the market's total liquidity.
    pub fn add_liquidity(&mut self, caller: &Address, market_id: MarketId, amount: Amount) -> Result<Amount, MarketError> {
        let now = self.clock.now();
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        if market.state != MarketState::Open {
            return Err(invalid_state(market));
        }
        if now >= market.end_time {
            return Err(MarketError::MarketClosed(market_id));
        }
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }

        let (yes, no) = Pools::split_liquidity(amount);
        let pools = Pools::new(
            market.pools.yes.checked_add(yes).ok_or(MarketError::Overflow)?,
            market.pools.no.checked_add(no).ok_or(MarketError::Overflow)?,
        );
        let total_liquidity = market.total_liquidity.checked_add(amount).ok_or(MarketError::Overflow)?;
        let contribution = market
            .liquidity_providers
            .get(caller)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(MarketError::Overflow)?;

        self.ledger
            .transfer(caller, &self.config.escrow, amount, TxType::LiquidityAdded, Some(market_id), now)?;

        market.pools = pools;
        market.total_liquidity = total_liquidity;
        market.liquidity_providers.insert(caller.clone(), contribution);

        self.emit(Event::LiquidityAdded {
            market_id,
            provider: caller.clone(),
            amount,
        });
        tracing::info!(%market_id, provider = %caller.short(), amount, total_liquidity, "💧 liquidity added");
        Ok(total_liquidity)
    }

    pub fn buy_shares(&mut self, caller: &Address, market_id: MarketId, side: Side, amount: Amount) -> Result<Purchase, MarketError> {
        let now = self.clock.now();
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        if market.state != MarketState::Open {
            return Err(invalid_state(market));
        }
        if now >= market.end_time {
            return Err(MarketError::MarketClosed(market_id));
        }
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        if !market.pools.is_liquid() {
            return Err(MarketError::NoLiquidity(market_id));
        }

        let quote = market
            .pools
            .quote(side, amount, market.fee_rate_bps)
            .ok_or(MarketError::Overflow)?;
        if quote.shares == 0 {
            return Err(MarketError::AmountTooSmall);
        }
        let pools = market.pools.after(side, &quote).ok_or(MarketError::Overflow)?;
        let fee_accrued = market.fee_accrued.checked_add(quote.fee).ok_or(MarketError::Overflow)?;
        let class = market.class_for(side);

        self.ledger
            .transfer(caller, &self.config.escrow, amount, TxType::SharePurchase, Some(market_id), now)?;
        if let Err(err) = self.shares.mint(caller, class, quote.shares) {
            self.ledger
                .transfer(&self.config.escrow, caller, amount, TxType::Transfer, Some(market_id), now)?;
            return Err(err.into());
        }

        let price_before = market.pools.price(side);
        market.pools = pools;
        market.fee_accrued = fee_accrued;
        let position = market.positions.entry(caller.clone()).or_default();
        position.spent = position.spent.saturating_add(amount);
        let price_after = market.pools.price(side);

        self.emit(Event::SharesPurchased {
            market_id,
            buyer: caller.clone(),
            side,
            amount,
            fee: quote.fee,
            shares: quote.shares,
        });
        tracing::info!(
            %market_id,
            buyer = %caller.short(),
            %side,
            amount,
            fee = quote.fee,
            shares = quote.shares,
            %price_after,
            "🛒 shares purchased"
        );
        Ok(Purchase {
            market_id,
            buyer: caller.clone(),
            side,
            amount,
            fee: quote.fee,
            net: quote.net,
            shares: quote.shares,
            price_before,
            price_after,
        })
    }

    /// Hand the market question to the resolution bridge once trading ended.
    /// The caller is recorded as the assertor.
    pub fn assert_question<O: TruthOracle>(
        &mut self,
        caller: &Address,
        market_id: MarketId,
        bridge: &mut ResolutionBridge<O>,
        wallet: &mut QuorumWallet,
    ) -> Result<AssertionTicket, MarketError> {
        let now = self.clock.now();
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        if market.state != MarketState::Open {
            return Err(MarketError::AlreadyAsserted(market_id));
        }
        if now < market.end_time {
            return Err(MarketError::MarketNotEnded {
                market_id,
                end_time: market.end_time,
            });
        }

        market.state = MarketState::AssertionPending;
        let ticket = match bridge.open_assertion(wallet, &market.question, caller) {
            Ok(ticket) => ticket,
            Err(err) => {
                market.state = MarketState::Open;
                tracing::warn!(%market_id, error = %err, "assertion failed, market reopened");
                return Err(err.into());
            }
        };
        market.question_id = Some(ticket.question_id);

        self.emit(Event::MarketAsserted {
            market_id,
            question_id: ticket.question_id,
        });
        tracing::info!(
            %market_id,
            caller = %caller.short(),
            question_id = %ticket.question_id,
            tx_id = %ticket.tx_id,
            "⏳ market asserted"
        );
        Ok(ticket)
    }

    /// Read the settled verdict and freeze the payout pots
    pub fn resolve_market<O: TruthOracle>(
        &mut self,
        caller: &Address,
        market_id: MarketId,
        bridge: &ResolutionBridge<O>,
    ) -> Result<bool, MarketError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        if market.state != MarketState::AssertionPending {
            return Err(invalid_state(market));
        }
        let Some(question_id) = market.question_id else {
            return Err(invalid_state(market));
        };
        let outcome = match bridge.get_result(&question_id) {
            Ok(outcome) => outcome,
            Err(BridgeError::NotSettled(_)) => return Err(MarketError::NotSettled(market_id)),
            Err(err) => return Err(err.into()),
        };

        let winning = Side::from_outcome(outcome);
        let winning_class = market.class_for(winning);
        let winning_supply = self
            .shares
            .total_supply(winning_class)
            .saturating_sub(self.shares.balance_of(&self.config.escrow, winning_class));
        let winning_pool = market.pools.side(winning);
        let losing_pool = market.pools.side(winning.opposite());
        let (winners_pot, lp_pool_pot) = if winning_supply > 0 {
            (winning_pool, losing_pool)
        } else {
            (0, losing_pool.saturating_add(winning_pool))
        };

        market.outcome = Some(outcome);
        market.state = MarketState::Resolved;
        market.settlement = Some(Settlement {
            winning_supply,
            winners_pot,
            lp_pool_pot,
            fee_pot: market.fee_accrued,
            liquidity_outstanding: market.total_liquidity,
            lp_pool_paid: 0,
            fees_paid: 0,
        });

        self.emit(Event::MarketResolved { market_id, outcome });
        tracing::info!(
            %market_id,
            caller = %caller.short(),
            outcome,
            winning_supply,
            winners_pot,
            lp_pool_pot,
            "✅ market resolved"
        );
        Ok(outcome)
    }

    /// Pay the caller's winning shares out of the winning pool
    pub fn claim_payout(&mut self, caller: &Address, market_id: MarketId) -> Result<Amount, MarketError> {
        let now = self.clock.now();
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let (settlement, winning) = match (market.state, market.settlement, market.winning_side()) {
            (MarketState::Resolved, Some(settlement), Some(winning)) => (settlement, winning),
            _ => return Err(invalid_state(market)),
        };
        let previous = market.positions.get(caller).copied();
        if previous.map(|p| p.claimed).unwrap_or(false) {
            return Err(MarketError::AlreadyClaimed {
                market_id,
                holder: caller.clone(),
            });
        }

        let winning_class = market.class_for(winning);
        let losing_class = market.class_for(winning.opposite());
        let winning_shares = self.shares.balance_of(caller, winning_class);
        if winning_shares == 0 {
            return Err(MarketError::NothingToClaim {
                market_id,
                holder: caller.clone(),
            });
        }
        let losing_shares = self.shares.balance_of(caller, losing_class);
        let outstanding = self
            .shares
            .total_supply(winning_class)
            .saturating_sub(self.shares.balance_of(&self.config.escrow, winning_class));
        // the last winning holder sweeps the rounding remainder
        let payout = if winning_shares >= outstanding {
            market.pools.side(winning)
        } else {
            mul_div(winning_shares, settlement.winners_pot, settlement.winning_supply).ok_or(MarketError::Overflow)?
        };
        let remaining_pool = market
            .pools
            .side(winning)
            .checked_sub(payout)
            .ok_or(MarketError::PoolExhausted(market_id))?;

        market.positions.entry(caller.clone()).or_default().claimed = true;
        let burns = [(winning_class, winning_shares), (losing_class, losing_shares)];
        if let Err(err) = burn_exact(&*self.shares, caller, &burns) {
            restore_position(market, caller, previous);
            return Err(err.into());
        }
        if payout > 0 {
            if let Err(err) = self
                .ledger
                .transfer(&self.config.escrow, caller, payout, TxType::Payout, Some(market_id), now)
            {
                remint(&*self.shares, caller, &burns);
                restore_position(market, caller, previous);
                return Err(err.into());
            }
        }
        *market.pools.side_mut(winning) = remaining_pool;

        self.emit(Event::PayoutClaimed {
            market_id,
            claimer: caller.clone(),
            amount: payout,
        });
        tracing::info!(%market_id, claimer = %caller.short(), winning_shares, payout, "💰 payout claimed");
        Ok(payout)
    }

    /// Return a provider's share of the pool pot and fees
    pub fn withdraw_liquidity(&mut self, caller: &Address, market_id: MarketId) -> Result<Amount, MarketError> {
        let now = self.clock.now();
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let (settlement, winning) = match (market.state, market.settlement, market.winning_side()) {
            (MarketState::Resolved, Some(settlement), Some(winning)) => (settlement, winning),
            _ => return Err(invalid_state(market)),
        };
        let contribution = match market.liquidity_providers.get(caller) {
            None => return Err(MarketError::Unauthorized(caller.clone())),
            Some(0) => {
                return Err(MarketError::AlreadyWithdrawn {
                    market_id,
                    provider: caller.clone(),
                })
            }
            Some(contribution) => *contribution,
        };

        let (pool_share, fee_share) = if contribution >= settlement.liquidity_outstanding {
            (
                settlement.lp_pool_pot.saturating_sub(settlement.lp_pool_paid),
                settlement.fee_pot.saturating_sub(settlement.fees_paid),
            )
        } else {
            (
                mul_div(contribution, settlement.lp_pool_pot, market.total_liquidity).ok_or(MarketError::Overflow)?,
                mul_div(contribution, settlement.fee_pot, market.total_liquidity).ok_or(MarketError::Overflow)?,
            )
        };
        let amount = pool_share.checked_add(fee_share).ok_or(MarketError::Overflow)?;

        let losing = winning.opposite();
        let from_losing = pool_share.min(market.pools.side(losing));
        let from_winning = pool_share - from_losing;
        let mut pools = market.pools;
        *pools.side_mut(losing) -= from_losing;
        *pools.side_mut(winning) = pools
            .side(winning)
            .checked_sub(from_winning)
            .ok_or(MarketError::PoolExhausted(market_id))?;
        let fee_accrued = market
            .fee_accrued
            .checked_sub(fee_share)
            .ok_or(MarketError::PoolExhausted(market_id))?;

        let snapshot = (market.pools, market.fee_accrued, market.settlement);
        market.liquidity_providers.insert(caller.clone(), 0);
        market.pools = pools;
        market.fee_accrued = fee_accrued;
        market.settlement = Some(Settlement {
            liquidity_outstanding: settlement.liquidity_outstanding.saturating_sub(contribution),
            lp_pool_paid: settlement.lp_pool_paid + pool_share,
            fees_paid: settlement.fees_paid + fee_share,
            ..settlement
        });

        if amount > 0 {
            if let Err(err) = self
                .ledger
                .transfer(&self.config.escrow, caller, amount, TxType::LiquidityWithdrawn, Some(market_id), now)
            {
                market.liquidity_providers.insert(caller.clone(), contribution);
                (market.pools, market.fee_accrued, market.settlement) = snapshot;
                return Err(err.into());
            }
        }

        self.emit(Event::LiquidityWithdrawn {
            market_id,
            provider: caller.clone(),
            amount,
        });
        tracing::info!(%market_id, provider = %caller.short(), pool_share, fee_share, "🏦 liquidity withdrawn");
        Ok(amount)
    }

    /// Burn residual shares after resolution: the escrow's own balances and
    /// every recorded holder's losing side. Unclaimed winning shares stay.
    pub fn burn_shares(&mut self, caller: &Address, market_id: MarketId) -> Result<BurnReport, MarketError> {
        if caller != &self.config.owner {
            tracing::warn!(caller = %caller.short(), %market_id, "burn rejected: not the owner");
            return Err(MarketError::Unauthorized(caller.clone()));
        }
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let winning = match (market.state, market.winning_side()) {
            (MarketState::Resolved, Some(winning)) => winning,
            _ => return Err(invalid_state(market)),
        };
        let escrow = &self.config.escrow;
        let losing_class = market.class_for(winning.opposite());

        let mut report = BurnReport {
            market_id,
            yes_burned: self.shares.burn_all(escrow, market.yes_class)?,
            no_burned: self.shares.burn_all(escrow, market.no_class)?,
        };
        let mut losing_burned = 0;
        for holder in market.positions.keys().filter(|holder| *holder != escrow) {
            losing_burned += self.shares.burn_all(holder, losing_class)?;
        }
        match winning.opposite() {
            Side::Yes => report.yes_burned += losing_burned,
            Side::No => report.no_burned += losing_burned,
        }

        self.emit(Event::SharesBurned {
            market_id,
            yes_burned: report.yes_burned,
            no_burned: report.no_burned,
        });
        tracing::info!(%market_id, yes_burned = report.yes_burned, no_burned = report.no_burned, "🔥 residual shares burned");
        Ok(report)
    }
}

fn restore_position(market: &mut Market, holder: &Address, previous: Option<PositionRecord>) {
    match previous {
        Some(record) => {
            market.positions.insert(holder.clone(), record);
        }
        None => {
            market.positions.remove(holder);
        }
    }
}
