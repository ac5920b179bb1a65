/// HTTP API tests
///
/// Requests go straight through the router with `tower::ServiceExt::oneshot`;
/// no socket is bound. Calls are signed with the deterministic dev accounts.
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use quorum_market::clock::ONE_HOUR;
use quorum_market::{
    handlers, units, AppConfig, AppState, CallRequest, ManualClock, MarketId, SharedState, SignedCall, Side,
};

// ============================================================================
// HELPERS
// ============================================================================

struct TestApp {
    state: SharedState,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new(config: AppConfig) -> Self {
        let clock = ManualClock::new(1_700_000_000);
        let state = AppState::with_clock(config, clock.clone()).unwrap();
        TestApp {
            state: Arc::new(Mutex::new(state)),
            clock,
        }
    }

    fn router(&self) -> Router {
        handlers::router(self.state.clone())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Sign `call` as the dev account `name` with its next nonce and submit it
    async fn submit(&self, name: &str, call: CallRequest) -> (StatusCode, Value) {
        let signed = self.sign(name, call).await;
        self.post("/rpc/submit", serde_json::to_value(&signed).unwrap()).await
    }

    async fn sign(&self, name: &str, call: CallRequest) -> SignedCall {
        let state = self.state.lock().await;
        let account = state.accounts.get(name).unwrap();
        let nonce = state.last_nonce(&account.address) + 1;
        SignedCall::sign(account, nonce, state.clock.now(), call)
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        threshold: Some(2),
        cooldown_secs: ONE_HOUR,
        ..AppConfig::default()
    }
}

// ============================================================================
// READ ENDPOINTS
// ============================================================================

#[tokio::test]
async fn test_health_and_info() {
    let app = TestApp::new(test_config());

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["markets"], 0);

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accounts"].as_array().unwrap().len(), 11);
    assert!(body["wallet"].as_str().unwrap().starts_with("0x"));
}

#[tokio::test]
async fn test_balance_nonce_and_faucet() {
    let app = TestApp::new(test_config());

    let (status, body) = app.get("/balance/alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], units(1_000));

    let (status, body) = app.post("/faucet", json!({ "address": "ALICE" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], units(2_000));

    let (status, body) = app.get("/rpc/nonce/ALICE").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["last_nonce"], 0);
    assert_eq!(body["next_nonce"], 1);

    let (status, body) = app.get("/balance/not-an-account").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_faucet_disabled() {
    let app = TestApp::new(AppConfig {
        faucet_amount: 0,
        ..test_config()
    });
    let (status, body) = app.post("/faucet", json!({ "address": "BOB" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "Disabled");
}

#[tokio::test]
async fn test_unknown_market_is_404() {
    let app = TestApp::new(test_config());
    let (status, body) = app.get("/markets/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NotFound");

    let (status, body) = app.get("/markets/7/price/yes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "MarketNotFound");
}

// ============================================================================
// SIGNED CALLS
// ============================================================================

#[tokio::test]
async fn test_signed_call_rejections() {
    let app = TestApp::new(test_config());
    let create = CallRequest::CreateMarket {
        question: "q".into(),
        duration_secs: ONE_HOUR,
    };

    let mut tampered = app.sign("ALICE", create.clone()).await;
    tampered.call = CallRequest::CreateMarket {
        question: "other".into(),
        duration_secs: ONE_HOUR,
    };
    let (status, body) = app.post("/rpc/submit", serde_json::to_value(&tampered).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "SignatureMismatch");

    let signed = app.sign("ALICE", create.clone()).await;
    let (status, _) = app.post("/rpc/submit", serde_json::to_value(&signed).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.post("/rpc/submit", serde_json::to_value(&signed).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "StaleNonce");

    let stale = app.sign("BOB", create).await;
    app.clock.advance(app.state.lock().await.config.tx_expiry_secs + 1);
    let (status, body) = app.post("/rpc/submit", serde_json::to_value(&stale).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "Expired");
}

#[tokio::test]
async fn test_market_flow_over_http() {
    let app = TestApp::new(test_config());

    let (status, body) = app
        .submit("OWNER", CallRequest::CreateMarket {
            question: "Will the HTTP test pass?".into(),
            duration_secs: ONE_HOUR,
        })
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["result"], "market_created");
    let market_id = MarketId(body["outcome"]["market_id"].as_u64().unwrap());

    app.submit("OWNER", CallRequest::AddLiquidity { market_id, amount: units(100) }).await;
    let (status, body) = app
        .submit("ALICE", CallRequest::BuyShares { market_id, side: Side::Yes, amount: units(10) })
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["result"], "shares_purchased");
    app.submit("BOB", CallRequest::BuyShares { market_id, side: Side::No, amount: units(10) }).await;

    let (status, body) = app.get("/markets/0/price/yes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["side"], "yes");

    let (status, body) = app.get("/markets/0/positions/alice").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["yes_shares"].as_u64().unwrap() > 0);

    let (status, body) = app.get("/markets/0/holders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["yes"].as_array().unwrap().len(), 1);
    assert_eq!(body["no"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/transactions/bob").await;
    assert_eq!(status, StatusCode::OK);
    // genesis drip + purchase
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app.get("/ledger").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["stats"]["transactions"].as_u64().unwrap() >= 4);

    // settle through the quorum wallet
    app.clock.advance(ONE_HOUR);
    let (status, body) = app.submit("OWNER", CallRequest::AssertQuestion { market_id }).await;
    assert_eq!(status, StatusCode::OK);
    let tx_id = serde_json::from_value(body["outcome"]["tx_id"].clone()).unwrap();
    let question_id = body["outcome"]["question_id"].as_str().unwrap().to_string();

    let (status, body) = app.submit("ALICE", CallRequest::SignTransaction { tx_id }).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NotASigner");
    app.submit("SIGNER1", CallRequest::SignTransaction { tx_id }).await;
    let (_, body) = app.submit("SIGNER2", CallRequest::SignTransaction { tx_id }).await;
    assert_eq!(body["outcome"]["signatures"], 2);

    let (status, body) = app.submit("BOB", CallRequest::ExecuteTransaction { tx_id }).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CooldownActive");
    app.clock.advance(ONE_HOUR);
    let (status, _) = app.submit("BOB", CallRequest::ExecuteTransaction { tx_id }).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/oracle/assertions/{}", question_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assertion"]["status"], "settled");
    assert_eq!(body["assertion"]["result"], true);

    let (status, body) = app.get("/wallet/transactions/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executed"], true);

    let (status, body) = app.submit("OWNER", CallRequest::ResolveMarket { market_id }).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["outcome"], true);

    let (status, body) = app.get("/markets/0/record").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[3], 2);
    assert_eq!(body[9], true);

    let (status, body) = app.submit("ALICE", CallRequest::ClaimPayout { market_id }).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["outcome"]["amount"].as_u64().unwrap() > units(10));

    let (status, body) = app.submit("ALICE", CallRequest::ClaimPayout { market_id }).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "AlreadyClaimed");

    let (status, body) = app.get("/events?since=0").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["event"].as_str())
        .collect();
    assert!(names.contains(&"MarketCreated"));
    assert!(names.contains(&"PayoutClaimed"));
}
