/// End-to-end market lifecycle tests
///
/// Drive the fully wired AppState (engine + bridge + quorum wallet) with the
/// deterministic dev accounts and a manual clock.
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quorum_market::clock::ONE_HOUR;
use quorum_market::{
    units, Address, AppConfig, AppState, CallOutcome, CallPayload, CallRequest, ManualClock, MarketId, MarketState,
    QuestionId, ShareLedger, Side, DEFAULT_COOLDOWN_SECS,
};

const START: u64 = 1_700_000_000;

// ============================================================================
// HELPERS
// ============================================================================

fn app(config: AppConfig) -> (AppState, Arc<ManualClock>) {
    let clock = ManualClock::new(START);
    let state = AppState::with_clock(config, clock.clone()).unwrap();
    (state, clock)
}

fn addr(state: &AppState, name: &str) -> Address {
    state.resolve_address(name).unwrap()
}

fn call(state: &mut AppState, name: &str, request: CallRequest) -> Result<CallOutcome, String> {
    let caller = addr(state, name);
    state.dispatch(&caller, request).map_err(|e| e.code().to_string())
}

/// Escrow holds exactly the pools and accrued fees of every market
fn assert_escrow_backed(state: &AppState) {
    let backing: u64 = state
        .engine
        .markets()
        .iter()
        .map(|m| m.pools.yes + m.pools.no + m.fee_accrued)
        .sum();
    assert_eq!(state.ledger.balance(state.engine.escrow()), backing);
}

/// Assert, collect every signature, wait out the cooldown and execute
fn settle(state: &mut AppState, clock: &ManualClock, market_id: MarketId) -> bool {
    let tx_id = match call(state, "OWNER", CallRequest::AssertQuestion { market_id }).unwrap() {
        CallOutcome::QuestionAsserted { tx_id, .. } => tx_id,
        other => panic!("unexpected outcome {:?}", other),
    };
    for signer in state.config.signers.clone() {
        state.dispatch(&signer, CallRequest::SignTransaction { tx_id }).unwrap();
    }
    clock.advance(state.config.cooldown_secs);
    call(state, "SIGNER1", CallRequest::ExecuteTransaction { tx_id }).unwrap();
    match call(state, "OWNER", CallRequest::ResolveMarket { market_id }).unwrap() {
        CallOutcome::MarketResolved { outcome, .. } => outcome,
        other => panic!("unexpected outcome {:?}", other),
    }
}

// ============================================================================
// SCENARIO
// ============================================================================

#[test]
fn test_full_lifecycle_yes_outcome() {
    let (mut state, clock) = app(AppConfig::default());
    assert_eq!(state.wallet.signers().len(), 5);
    assert_eq!(state.wallet.threshold(), 5);
    assert_eq!(state.wallet.cooldown_secs(), DEFAULT_COOLDOWN_SECS);

    call(&mut state, "OWNER", CallRequest::CreateMarket {
        question: "Will the launch happen this hour?".into(),
        duration_secs: ONE_HOUR,
    })
    .unwrap();
    let market_id = MarketId(0);
    call(&mut state, "OWNER", CallRequest::AddLiquidity { market_id, amount: units(100) }).unwrap();

    let yes_buyers = ["ALICE", "BOB", "CAROL", "DAVE"];
    let mut last_shares = u64::MAX;
    for name in yes_buyers {
        let purchase = match call(&mut state, name, CallRequest::BuyShares {
            market_id,
            side: Side::Yes,
            amount: units(10),
        })
        .unwrap()
        {
            CallOutcome::SharesPurchased(purchase) => purchase,
            other => panic!("unexpected outcome {:?}", other),
        };
        // YES gets dearer as its pool grows
        assert!(purchase.price_after > purchase.price_before);
        assert!(purchase.shares < last_shares);
        last_shares = purchase.shares;
    }
    call(&mut state, "ERIN", CallRequest::BuyShares { market_id, side: Side::No, amount: units(10) }).unwrap();
    assert_escrow_backed(&state);

    // trading closes at end_time, asserting opens
    assert_eq!(
        call(&mut state, "OWNER", CallRequest::AssertQuestion { market_id }).unwrap_err(),
        "MarketNotEnded"
    );
    clock.advance(ONE_HOUR);
    assert_eq!(
        call(&mut state, "ALICE", CallRequest::BuyShares { market_id, side: Side::Yes, amount: units(1) }).unwrap_err(),
        "MarketClosed"
    );

    // settlement is gated on every signature and the cooldown
    let tx_id = match call(&mut state, "OWNER", CallRequest::AssertQuestion { market_id }).unwrap() {
        CallOutcome::QuestionAsserted { tx_id, .. } => tx_id,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(state.engine.market(market_id).unwrap().state, MarketState::AssertionPending);
    assert_eq!(
        call(&mut state, "OWNER", CallRequest::ResolveMarket { market_id }).unwrap_err(),
        "NotSettled"
    );
    for signer in ["SIGNER1", "SIGNER2", "SIGNER3", "SIGNER4"] {
        call(&mut state, signer, CallRequest::SignTransaction { tx_id }).unwrap();
    }
    assert_eq!(
        call(&mut state, "SIGNER1", CallRequest::ExecuteTransaction { tx_id }).unwrap_err(),
        "QuorumNotMet"
    );
    call(&mut state, "SIGNER5", CallRequest::SignTransaction { tx_id }).unwrap();
    assert_eq!(
        call(&mut state, "SIGNER1", CallRequest::ExecuteTransaction { tx_id }).unwrap_err(),
        "CooldownActive"
    );
    clock.advance(DEFAULT_COOLDOWN_SECS);
    call(&mut state, "SIGNER1", CallRequest::ExecuteTransaction { tx_id }).unwrap();
    assert_eq!(
        call(&mut state, "SIGNER2", CallRequest::ExecuteTransaction { tx_id }).unwrap_err(),
        "AlreadyExecuted"
    );
    assert_eq!(
        call(&mut state, "OWNER", CallRequest::ResolveMarket { market_id }).unwrap(),
        CallOutcome::MarketResolved { market_id, outcome: true }
    );
    assert!(state.engine.record(market_id).unwrap().9);

    // every YES holder is paid
    for name in yes_buyers {
        let before = state.ledger.balance(&addr(&state, name));
        let paid = match call(&mut state, name, CallRequest::ClaimPayout { market_id }).unwrap() {
            CallOutcome::PayoutClaimed { amount, .. } => amount,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert!(paid > 0);
        assert_eq!(state.ledger.balance(&addr(&state, name)), before + paid);
        assert_escrow_backed(&state);
    }
    assert_eq!(
        call(&mut state, "ERIN", CallRequest::ClaimPayout { market_id }).unwrap_err(),
        "NothingToClaim"
    );
    assert_eq!(
        call(&mut state, "ALICE", CallRequest::ClaimPayout { market_id }).unwrap_err(),
        "AlreadyClaimed"
    );

    // the provider takes the losing pool and the fees
    let escrow = state.engine.escrow().clone();
    let escrow_before = state.ledger.balance(&escrow);
    let withdrawn = match call(&mut state, "OWNER", CallRequest::WithdrawLiquidity { market_id }).unwrap() {
        CallOutcome::LiquidityWithdrawn { amount, .. } => amount,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(withdrawn > 0);
    assert_eq!(state.ledger.balance(&escrow), escrow_before - withdrawn);
    assert_eq!(state.ledger.balance(&escrow), 0);
    assert_eq!(
        call(&mut state, "OWNER", CallRequest::WithdrawLiquidity { market_id }).unwrap_err(),
        "AlreadyWithdrawn"
    );
    assert_escrow_backed(&state);

    // shares parked at the escrow and losing shares are burned
    let market = state.engine.market(market_id).unwrap().clone();
    let erin = addr(&state, "ERIN");
    assert!(state.shares.balance_of(&erin, market.no_class) > 0);
    state.shares.mint(&escrow, market.yes_class, units(1)).unwrap();

    assert_eq!(
        call(&mut state, "ALICE", CallRequest::BurnShares { market_id }).unwrap_err(),
        "Unauthorized"
    );
    call(&mut state, "OWNER", CallRequest::BurnShares { market_id }).unwrap();
    assert_eq!(state.shares.balance_of(&escrow, market.yes_class), 0);
    assert_eq!(state.shares.balance_of(&escrow, market.no_class), 0);
    assert_eq!(state.shares.balance_of(&erin, market.no_class), 0);

    // burning twice changes nothing
    assert_eq!(
        call(&mut state, "OWNER", CallRequest::BurnShares { market_id }).unwrap(),
        CallOutcome::SharesBurned(quorum_market::BurnReport {
            market_id,
            yes_burned: 0,
            no_burned: 0,
        })
    );
}

#[test]
fn test_no_outcome_pays_no_side() {
    let config = AppConfig {
        threshold: Some(3),
        cooldown_secs: ONE_HOUR,
        ..AppConfig::default()
    };
    let (mut state, clock) = app(config);
    let question = "Will it snow in July?";
    state.bridge.oracle_mut().set_verdict(question, false);

    call(&mut state, "OWNER", CallRequest::CreateMarket { question: question.into(), duration_secs: ONE_HOUR }).unwrap();
    let market_id = MarketId(0);
    call(&mut state, "OWNER", CallRequest::AddLiquidity { market_id, amount: units(50) }).unwrap();
    call(&mut state, "ALICE", CallRequest::BuyShares { market_id, side: Side::Yes, amount: units(20) }).unwrap();
    call(&mut state, "BOB", CallRequest::BuyShares { market_id, side: Side::No, amount: units(5) }).unwrap();
    clock.advance(ONE_HOUR);

    let tx_id = match call(&mut state, "OWNER", CallRequest::AssertQuestion { market_id }).unwrap() {
        CallOutcome::QuestionAsserted { tx_id, .. } => tx_id,
        other => panic!("unexpected outcome {:?}", other),
    };
    for signer in ["SIGNER1", "SIGNER2", "SIGNER3"] {
        call(&mut state, signer, CallRequest::SignTransaction { tx_id }).unwrap();
    }
    assert_eq!(
        call(&mut state, "ALICE", CallRequest::SignTransaction { tx_id }).unwrap_err(),
        "NotASigner"
    );
    clock.advance(ONE_HOUR);
    call(&mut state, "BOB", CallRequest::ExecuteTransaction { tx_id }).unwrap();
    assert_eq!(
        call(&mut state, "OWNER", CallRequest::ResolveMarket { market_id }).unwrap(),
        CallOutcome::MarketResolved { market_id, outcome: false }
    );

    assert_eq!(
        call(&mut state, "ALICE", CallRequest::ClaimPayout { market_id }).unwrap_err(),
        "NothingToClaim"
    );
    let bob_before = state.ledger.balance(&addr(&state, "BOB"));
    call(&mut state, "BOB", CallRequest::ClaimPayout { market_id }).unwrap();
    assert!(state.ledger.balance(&addr(&state, "BOB")) > bob_before);
    assert_escrow_backed(&state);
}

#[test]
fn test_markets_settle_independently() {
    let config = AppConfig {
        threshold: Some(1),
        cooldown_secs: 0,
        ..AppConfig::default()
    };
    let (mut state, clock) = app(config);
    state.bridge.oracle_mut().set_verdict("second", false);

    for question in ["first", "second"] {
        call(&mut state, "OWNER", CallRequest::CreateMarket { question: question.into(), duration_secs: 10 }).unwrap();
    }
    for id in [MarketId(0), MarketId(1)] {
        call(&mut state, "OWNER", CallRequest::AddLiquidity { market_id: id, amount: units(10) }).unwrap();
        call(&mut state, "ALICE", CallRequest::BuyShares { market_id: id, side: Side::Yes, amount: units(2) }).unwrap();
    }
    clock.advance(10);

    assert!(settle(&mut state, &clock, MarketId(0)));
    assert_eq!(state.engine.market(MarketId(1)).unwrap().state, MarketState::Open);
    assert!(!settle(&mut state, &clock, MarketId(1)));
    assert_escrow_backed(&state);
}

#[test]
fn test_wallet_only_stages_executable_calls() {
    let (mut state, _) = app(AppConfig::default());
    let oracle = state.bridge.oracle_address().clone();
    let settle = CallPayload::SettleAssertion {
        question_id: QuestionId([3u8; 32]),
        claim: "claim".into(),
    };

    let custom = CallPayload::Custom {
        method: "sweep".into(),
        args: serde_json::json!({ "to": "ALICE" }),
    };
    assert_eq!(
        call(&mut state, "SIGNER1", CallRequest::ProposeTransaction {
            target: oracle.clone(),
            payload: custom,
            value: 0,
        })
        .unwrap_err(),
        "UnsupportedCall"
    );
    assert_eq!(
        call(&mut state, "SIGNER1", CallRequest::ProposeTransaction {
            target: oracle.clone(),
            payload: settle.clone(),
            value: units(5),
        })
        .unwrap_err(),
        "ValueNotSupported"
    );
    let stray = addr(&state, "ALICE");
    assert_eq!(
        call(&mut state, "SIGNER1", CallRequest::ProposeTransaction {
            target: stray,
            payload: settle.clone(),
            value: 0,
        })
        .unwrap_err(),
        "UnknownTarget"
    );
    assert_eq!(state.wallet.transactions().count(), 0);

    assert!(matches!(
        call(&mut state, "SIGNER1", CallRequest::ProposeTransaction { target: oracle, payload: settle, value: 0 }),
        Ok(CallOutcome::TransactionProposed { .. })
    ));
}

// ============================================================================
// RANDOMISED CONSERVATION
// ============================================================================

#[test]
fn test_random_trading_conserves_funds() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let traders = ["ALICE", "BOB", "CAROL", "DAVE", "ERIN"];
    let providers = ["OWNER", "SIGNER1"];

    for round in 0..8 {
        let config = AppConfig {
            threshold: Some(1),
            cooldown_secs: 0,
            ..AppConfig::default()
        };
        let (mut state, clock) = app(config);
        let supply = state.ledger.stats().total_supply;
        let question = format!("round {}", round);
        state.bridge.oracle_mut().set_verdict(&question, rng.gen_bool(0.5));

        call(&mut state, "OWNER", CallRequest::CreateMarket { question, duration_secs: ONE_HOUR }).unwrap();
        let market_id = MarketId(0);
        for provider in providers {
            let amount = units(rng.gen_range(1..200));
            call(&mut state, provider, CallRequest::AddLiquidity { market_id, amount }).unwrap();
        }
        for _ in 0..40 {
            let trader = traders[rng.gen_range(0..traders.len())];
            let side = if rng.gen_bool(0.5) { Side::Yes } else { Side::No };
            let amount = rng.gen_range(units(1)..units(25));
            call(&mut state, trader, CallRequest::BuyShares { market_id, side, amount }).unwrap();
            assert_escrow_backed(&state);
        }

        clock.advance(ONE_HOUR);
        settle(&mut state, &clock, market_id);

        let mut claims = traders.to_vec();
        claims.extend(providers);
        for name in claims {
            if let Err(code) = call(&mut state, name, CallRequest::ClaimPayout { market_id }) {
                assert_eq!(code, "NothingToClaim", "{} claim failed", name);
            }
            assert_escrow_backed(&state);
        }
        for provider in providers {
            call(&mut state, provider, CallRequest::WithdrawLiquidity { market_id }).unwrap();
            assert_escrow_backed(&state);
        }

        // last claimant and last provider sweep the rounding dust
        let escrow = state.ledger.balance(state.engine.escrow());
        assert_eq!(escrow, 0, "round {} left {} in escrow", round, escrow);
        assert_eq!(state.ledger.stats().total_supply, supply);
    }
}
