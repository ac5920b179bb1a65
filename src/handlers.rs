// HTTP request handlers for the quorum market API

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::events::LogEntry;
use crate::ledger::Transaction;
use crate::market_resolve::{MarketId, MarketRecord, Position, Side};
use crate::models::*;
use crate::oracle::{QuestionId, TruthOracle};
use crate::quorum::{QuorumTransaction, TxId};
use crate::rpc::SignedCall;

pub const ENDPOINTS: [&str; 19] = [
    "GET  /health",
    "GET  /markets",
    "GET  /markets/:id",
    "GET  /markets/:id/record",
    "GET  /markets/:id/price/:side",
    "GET  /markets/:id/positions/:address",
    "GET  /markets/:id/holders",
    "GET  /wallet",
    "GET  /wallet/transactions/:id",
    "GET  /oracle",
    "GET  /oracle/assertions/:question_id",
    "GET  /balance/:address",
    "GET  /transactions/:address",
    "GET  /ledger",
    "GET  /rpc/nonce/:address",
    "GET  /events?since=",
    "POST /rpc/submit",
    "POST /faucet",
    "GET  /",
];

const RECENT_TRANSACTIONS: usize = 50;

/// Build the API router with CORS and request tracing
pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== INFO =====
        .route("/", get(api_info))
        .route("/health", get(health_check))
        // ===== MARKETS =====
        .route("/markets", get(list_markets))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/record", get(get_market_record))
        .route("/markets/:id/price/:side", get(get_price))
        .route("/markets/:id/positions/:address", get(get_position))
        .route("/markets/:id/holders", get(get_holders))
        // ===== QUORUM WALLET / ORACLE =====
        .route("/wallet", get(get_wallet))
        .route("/wallet/transactions/:id", get(get_wallet_transaction))
        .route("/oracle", get(get_oracle))
        .route("/oracle/assertions/:question_id", get(get_assertion))
        // ===== LEDGER =====
        .route("/balance/:address", get(get_balance))
        .route("/transactions/:address", get(get_transactions))
        .route("/ledger", get(get_ledger_activity))
        .route("/rpc/nonce/:address", get(get_nonce))
        .route("/events", get(get_events))
        // ===== SIGNED CALLS =====
        .route("/rpc/submit", post(submit_call))
        .route("/faucet", post(faucet))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ===== INFO =====

pub async fn api_info(State(state): State<SharedState>) -> Json<ApiInfo> {
    let app_state = state.lock().await;
    Json(ApiInfo {
        service: "Quorum Market".into(),
        engine: app_state.engine.escrow().clone(),
        wallet: app_state.wallet.address().clone(),
        bridge: app_state.bridge.address().clone(),
        oracle: app_state.bridge.oracle_address().clone(),
        accounts: app_state.accounts.list(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let app_state = state.lock().await;
    Json(HealthResponse {
        status: "ok".into(),
        service: "Quorum Market - Online ✅".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        now: app_state.clock.now(),
        markets: app_state.engine.markets().len(),
        events: app_state.events.len(),
    })
}

// ===== MARKETS =====

pub async fn list_markets(State(state): State<SharedState>) -> Json<Vec<MarketSummary>> {
    let app_state = state.lock().await;
    Json(app_state.engine.markets().into_iter().map(MarketSummary::from).collect())
}

pub async fn get_market(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<MarketSummary>, ApiError> {
    let app_state = state.lock().await;
    let market = app_state
        .engine
        .market(MarketId(id))
        .ok_or_else(|| ApiError::NotFound(format!("market {}", id)))?;
    Ok(Json(MarketSummary::from(market)))
}

pub async fn get_market_record(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<MarketRecord>, ApiError> {
    let app_state = state.lock().await;
    app_state
        .engine
        .record(MarketId(id))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("market {}", id)))
}

pub async fn get_price(
    State(state): State<SharedState>,
    Path((id, side)): Path<(u64, String)>,
) -> Result<Json<PriceResponse>, ApiError> {
    let side: Side = side.parse().map_err(ApiError::BadRequest)?;
    let app_state = state.lock().await;
    let price = app_state.engine.get_price(MarketId(id), side)?;
    Ok(Json(PriceResponse {
        market_id: MarketId(id),
        side,
        price,
    }))
}

pub async fn get_position(
    State(state): State<SharedState>,
    Path((id, address)): Path<(u64, String)>,
) -> Result<Json<Position>, ApiError> {
    let app_state = state.lock().await;
    let holder = app_state.resolve_address(&address)?;
    app_state
        .engine
        .position(MarketId(id), &holder)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("market {}", id)))
}

pub async fn get_holders(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<HoldersResponse>, ApiError> {
    let app_state = state.lock().await;
    let market = app_state
        .engine
        .market(MarketId(id))
        .ok_or_else(|| ApiError::NotFound(format!("market {}", id)))?;
    Ok(Json(HoldersResponse {
        market_id: market.id,
        yes: app_state.shares.holders(market.yes_class),
        no: app_state.shares.holders(market.no_class),
    }))
}

// ===== QUORUM WALLET / ORACLE =====

pub async fn get_wallet(State(state): State<SharedState>) -> Json<WalletInfo> {
    let app_state = state.lock().await;
    let wallet = &app_state.wallet;
    Json(WalletInfo {
        address: wallet.address().clone(),
        signers: wallet.signers().to_vec(),
        threshold: wallet.threshold(),
        cooldown_secs: wallet.cooldown_secs(),
        transactions: wallet.transactions().cloned().collect(),
    })
}

pub async fn get_wallet_transaction(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<QuorumTransaction>, ApiError> {
    let app_state = state.lock().await;
    app_state
        .wallet
        .transaction(TxId(id))
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("transaction {}", id)))
}

pub async fn get_oracle(State(state): State<SharedState>) -> Json<OracleInfo> {
    let app_state = state.lock().await;
    Json(OracleInfo {
        oracle: app_state.bridge.oracle().address().clone(),
        bridge: app_state.bridge.address().clone(),
        assertions: app_state.bridge.assertions().into_iter().cloned().collect(),
    })
}

pub async fn get_assertion(
    State(state): State<SharedState>,
    Path(question_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let question_id: QuestionId = question_id.parse()?;
    let app_state = state.lock().await;
    let assertion = app_state
        .bridge
        .assertion(&question_id)
        .ok_or_else(|| ApiError::NotFound(format!("assertion {}", question_id)))?;
    Ok(Json(json!({
        "assertion": assertion,
        "oracle_claim": app_state.bridge.oracle().claim(&question_id),
    })))
}

// ===== LEDGER =====

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let app_state = state.lock().await;
    let address = app_state.resolve_address(&address)?;
    Ok(Json(BalanceResponse {
        balance: app_state.ledger.balance(&address),
        address,
    }))
}

pub async fn get_transactions(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let app_state = state.lock().await;
    let address = app_state.resolve_address(&address)?;
    Ok(Json(app_state.ledger.transactions_for(&address)))
}

pub async fn get_ledger_activity(State(state): State<SharedState>) -> Json<LedgerActivity> {
    let app_state = state.lock().await;
    Json(LedgerActivity {
        stats: app_state.ledger.stats(),
        recent: app_state.ledger.recent_transactions(RECENT_TRANSACTIONS),
    })
}

pub async fn get_nonce(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Json<NonceResponse>, ApiError> {
    let app_state = state.lock().await;
    let address = app_state.resolve_address(&address)?;
    let last_nonce = app_state.last_nonce(&address);
    Ok(Json(NonceResponse {
        address,
        last_nonce,
        next_nonce: last_nonce + 1,
    }))
}

pub async fn get_events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<LogEntry>> {
    let app_state = state.lock().await;
    Json(app_state.events.since(query.since.unwrap_or(0)))
}

// ===== SIGNED CALLS =====

pub async fn submit_call(
    State(state): State<SharedState>,
    Json(call): Json<SignedCall>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let nonce = call.nonce;
    let mut app_state = state.lock().await;
    let (sender, outcome) = app_state.submit(call)?;

    tracing::info!(sender = %sender.short(), nonce, "✅ signed call executed");
    Ok(Json(SubmitResponse {
        ok: true,
        sender,
        nonce,
        outcome,
    }))
}

pub async fn faucet(
    State(state): State<SharedState>,
    Json(request): Json<FaucetRequest>,
) -> Result<Json<FaucetResponse>, ApiError> {
    let mut app_state = state.lock().await;
    let address = app_state.resolve_address(&request.address)?;
    let balance = app_state.faucet(&address)?;
    Ok(Json(FaucetResponse {
        address,
        amount: app_state.config.faucet_amount,
        balance,
    }))
}
