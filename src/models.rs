// Request and response models for the quorum market API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::{AccountInfo, Address};
use crate::app_state::CallOutcome;
use crate::bridge::Assertion;
use crate::clock::Timestamp;
use crate::ledger::{Amount, LedgerStats, Transaction};
use crate::market_resolve::{Market, MarketId, MarketState, Pools, Side};
use crate::oracle::QuestionId;
use crate::quorum::QuorumTransaction;

// ===== HEALTH =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub now: Timestamp,
    pub markets: usize,
    pub events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub service: String,
    pub engine: Address,
    pub wallet: Address,
    pub bridge: Address,
    pub oracle: Address,
    pub accounts: Vec<AccountInfo>,
    pub endpoints: Vec<String>,
}

// ===== MARKETS =====

/// Market overview with live prices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub id: MarketId,
    pub question: String,
    pub state: MarketState,
    pub end_time: Timestamp,
    pub created_at: Timestamp,
    pub creator: Address,
    pub pools: Pools,
    pub yes_price: Decimal,
    pub no_price: Decimal,
    pub total_liquidity: Amount,
    pub fee_accrued: Amount,
    pub outcome: Option<bool>,
    pub question_id: Option<QuestionId>,
}

impl From<&Market> for MarketSummary {
    fn from(market: &Market) -> Self {
        MarketSummary {
            id: market.id,
            question: market.question.clone(),
            state: market.state,
            end_time: market.end_time,
            created_at: market.created_at,
            creator: market.creator.clone(),
            pools: market.pools,
            yes_price: market.pools.price(Side::Yes),
            no_price: market.pools.price(Side::No),
            total_liquidity: market.total_liquidity,
            fee_accrued: market.fee_accrued,
            outcome: market.outcome,
            question_id: market.question_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    pub market_id: MarketId,
    pub side: Side,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldersResponse {
    pub market_id: MarketId,
    pub yes: Vec<(Address, Amount)>,
    pub no: Vec<(Address, Amount)>,
}

// ===== LEDGER =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerActivity {
    pub stats: LedgerStats,
    pub recent: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: Address,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceResponse {
    pub address: Address,
    pub last_nonce: u64,
    pub next_nonce: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaucetRequest {
    /// Dev account name or address
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetResponse {
    pub address: Address,
    pub amount: Amount,
    pub balance: Amount,
}

// ===== WALLET / ORACLE =====

#[derive(Debug, Clone, Serialize)]
pub struct WalletInfo {
    pub address: Address,
    pub signers: Vec<Address>,
    pub threshold: usize,
    pub cooldown_secs: u64,
    pub transactions: Vec<QuorumTransaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OracleInfo {
    pub oracle: Address,
    pub bridge: Address,
    pub assertions: Vec<Assertion>,
}

// ===== SIGNED CALLS =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub sender: Address,
    pub nonce: u64,
    pub outcome: CallOutcome,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    pub since: Option<u64>,
}
