// Application state management
//
// One AppState owns the three components (engine, bridge, wallet) and the
// shared books they write to. The server serialises access through
// `SharedState`; every signed call is authenticated here and then
// dispatched with the verified sender as the caller.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::accounts::{Address, DevAccounts, DEV_ACCOUNT_NAMES};
use crate::bridge::{Assertion, AssertionTicket, ResolutionBridge};
use crate::clock::{SharedClock, SystemClock, Timestamp};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::events::{EventLog, LogEntry};
use crate::ledger::{Amount, Ledger};
use crate::market_resolve::{BurnReport, EngineConfig, MarketEngine, MarketId, MarketRecord, Purchase};
use crate::oracle::{OptimisticOracle, QuestionId};
use crate::quorum::{QuorumTransaction, QuorumWallet, TxId, WalletConfig};
use crate::rpc::{CallRequest, SignedCall, SignedCallError};
use crate::shares::SharesManager;

pub type SharedState = Arc<tokio::sync::Mutex<AppState>>;

/// Labels the component addresses are derived from
pub const ENGINE_LABEL: &str = "market_engine";
pub const WALLET_LABEL: &str = "quorum_wallet";
pub const BRIDGE_LABEL: &str = "resolution_bridge";
pub const ORACLE_LABEL: &str = "optimistic_oracle";

/// Result of a dispatched call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CallOutcome {
    MarketCreated { market_id: MarketId },
    LiquidityAdded { market_id: MarketId, total_liquidity: Amount },
    SharesPurchased(Purchase),
    QuestionAsserted { market_id: MarketId, question_id: QuestionId, tx_id: TxId },
    MarketResolved { market_id: MarketId, outcome: bool },
    PayoutClaimed { market_id: MarketId, amount: Amount },
    LiquidityWithdrawn { market_id: MarketId, amount: Amount },
    SharesBurned(BurnReport),
    TransactionProposed { tx_id: TxId },
    TransactionSigned { tx_id: TxId, signatures: usize },
    TransactionExecuted { tx_id: TxId },
}

/// JSON snapshot written on shutdown
#[derive(Debug, Serialize)]
struct PersistedState<'a> {
    saved_at: Timestamp,
    markets: Vec<MarketRecord>,
    transactions: Vec<&'a QuorumTransaction>,
    assertions: Vec<&'a Assertion>,
    nonces: BTreeMap<&'a Address, u64>,
    events: Vec<LogEntry>,
}

pub struct AppState {
    pub config: AppConfig,
    pub clock: SharedClock,
    pub events: EventLog,
    pub ledger: Ledger,
    pub shares: SharesManager,
    pub engine: MarketEngine,
    pub bridge: ResolutionBridge,
    pub wallet: QuorumWallet,
    pub accounts: DevAccounts,
    /// Last accepted nonce per sender
    pub nonces: HashMap<Address, u64>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self, ApiError> {
        Self::with_clock(config, SystemClock::shared())
    }

    pub fn with_clock(config: AppConfig, clock: SharedClock) -> Result<Self, ApiError> {
        tracing::info!("🚀 Initializing quorum market...");
        config.validate()?;

        let accounts = DevAccounts::new();
        let owner = accounts
            .get("OWNER")
            .map(|account| account.address.clone())
            .ok_or_else(|| ApiError::Internal("OWNER dev account missing".into()))?;
        let events = EventLog::new();
        let ledger = Ledger::new();
        let shares = SharesManager::new();

        let escrow = Address::contract(ENGINE_LABEL);
        let wallet_address = Address::contract(WALLET_LABEL);
        let bridge_address = Address::contract(BRIDGE_LABEL);

        let engine = MarketEngine::new(
            EngineConfig::new(owner, escrow).with_fee_rate(config.fee_rate_bps),
            Arc::new(shares.clone()),
            ledger.clone(),
            events.clone(),
            clock.clone(),
        )?;

        let mut wallet_config = WalletConfig::new(config.signers.clone())
            .with_cooldown(config.cooldown_secs)
            .with_proposer(bridge_address.clone());
        wallet_config.threshold = config.threshold;
        let wallet = QuorumWallet::new(wallet_address.clone(), wallet_config, clock.clone(), events.clone())?;

        let oracle = OptimisticOracle::new(Address::contract(ORACLE_LABEL), wallet_address);
        let bridge = ResolutionBridge::new(bridge_address, oracle, clock.clone(), events.clone());

        let mut state = AppState {
            config,
            clock,
            events,
            ledger,
            shares,
            engine,
            bridge,
            wallet,
            accounts,
            nonces: HashMap::new(),
        };
        state.fund_dev_accounts()?;
        Ok(state)
    }

    /// Genesis funding: every dev account starts with one faucet drip
    fn fund_dev_accounts(&mut self) -> Result<(), ApiError> {
        if self.config.faucet_amount == 0 {
            return Ok(());
        }
        let now = self.clock.now();
        for name in DEV_ACCOUNT_NAMES.iter() {
            if let Some(account) = self.accounts.get(name) {
                self.ledger.deposit(&account.address, self.config.faucet_amount, now)?;
            }
        }
        tracing::info!(accounts = DEV_ACCOUNT_NAMES.len(), amount = self.config.faucet_amount, "💰 dev accounts funded");
        Ok(())
    }

    /// Resolve a dev account name or literal address
    pub fn resolve_address(&self, identifier: &str) -> Result<Address, ApiError> {
        self.accounts
            .resolve(identifier)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown account or address: {}", identifier)))
    }

    pub fn last_nonce(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    /// Authenticate a signed call, consume its nonce and dispatch it
    pub fn submit(&mut self, call: SignedCall) -> Result<(Address, CallOutcome), ApiError> {
        let now = self.clock.now();
        let sender = call.validate(now, self.config.tx_expiry_secs)?;

        let last = self.last_nonce(&sender);
        if call.nonce <= last {
            return Err(SignedCallError::StaleNonce { last, got: call.nonce }.into());
        }
        self.nonces.insert(sender.clone(), call.nonce);

        tracing::debug!(sender = %sender.short(), nonce = call.nonce, call_type = ?call.call_type, "signed call accepted");
        let outcome = self.dispatch(&sender, call.call)?;
        Ok((sender, outcome))
    }

    /// Run a call on behalf of an already authenticated caller
    pub fn dispatch(&mut self, caller: &Address, call: CallRequest) -> Result<CallOutcome, ApiError> {
        let outcome = match call {
            CallRequest::CreateMarket { question, duration_secs } => CallOutcome::MarketCreated {
                market_id: self.engine.create_market(caller, &question, duration_secs)?,
            },
            CallRequest::AddLiquidity { market_id, amount } => CallOutcome::LiquidityAdded {
                market_id,
                total_liquidity: self.engine.add_liquidity(caller, market_id, amount)?,
            },
            CallRequest::BuyShares { market_id, side, amount } => {
                CallOutcome::SharesPurchased(self.engine.buy_shares(caller, market_id, side, amount)?)
            }
            CallRequest::AssertQuestion { market_id } => {
                let AssertionTicket { question_id, tx_id } =
                    self.engine
                        .assert_question(caller, market_id, &mut self.bridge, &mut self.wallet)?;
                CallOutcome::QuestionAsserted {
                    market_id,
                    question_id,
                    tx_id,
                }
            }
            CallRequest::ResolveMarket { market_id } => CallOutcome::MarketResolved {
                market_id,
                outcome: self.engine.resolve_market(caller, market_id, &self.bridge)?,
            },
            CallRequest::ClaimPayout { market_id } => CallOutcome::PayoutClaimed {
                market_id,
                amount: self.engine.claim_payout(caller, market_id)?,
            },
            CallRequest::WithdrawLiquidity { market_id } => CallOutcome::LiquidityWithdrawn {
                market_id,
                amount: self.engine.withdraw_liquidity(caller, market_id)?,
            },
            CallRequest::BurnShares { market_id } => CallOutcome::SharesBurned(self.engine.burn_shares(caller, market_id)?),
            CallRequest::ProposeTransaction { target, payload, value } => CallOutcome::TransactionProposed {
                tx_id: self
                    .wallet
                    .propose_transaction(caller, target, payload, value, &self.bridge)?,
            },
            CallRequest::SignTransaction { tx_id } => CallOutcome::TransactionSigned {
                tx_id,
                signatures: self.wallet.sign_transaction(caller, tx_id)?,
            },
            CallRequest::ExecuteTransaction { tx_id } => {
                self.wallet.execute_transaction(caller, tx_id, &mut self.bridge)?;
                CallOutcome::TransactionExecuted { tx_id }
            }
        };
        Ok(outcome)
    }

    /// Dev faucet. Disabled when the configured amount is zero.
    pub fn faucet(&mut self, address: &Address) -> Result<Amount, ApiError> {
        if self.config.faucet_amount == 0 {
            return Err(ApiError::Disabled("faucet is disabled".into()));
        }
        let balance = self
            .ledger
            .deposit(address, self.config.faucet_amount, self.clock.now())?;
        tracing::info!(address = %address.short(), amount = self.config.faucet_amount, balance, "🚰 faucet drip");
        Ok(balance)
    }

    /// Write the snapshot to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ApiError> {
        let snapshot = PersistedState {
            saved_at: self.clock.now(),
            markets: self.engine.markets().into_iter().map(|market| market.record()).collect(),
            transactions: self.wallet.transactions().collect(),
            assertions: self.bridge.assertions(),
            nonces: self.nonces.iter().map(|(address, nonce)| (address, *nonce)).collect(),
            events: self.events.all(),
        };

        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| ApiError::Internal(format!("failed to serialize state: {}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ApiError::Internal(format!("failed to create {}: {}", parent.display(), e)))?;
        }
        fs::write(path, json).map_err(|e| ApiError::Internal(format!("failed to write state file: {}", e)))?;

        tracing::info!(path = %path.display(), markets = snapshot.markets.len(), "💾 state saved to disk");
        Ok(())
    }

    pub fn save_to_disk(&self) -> Result<(), ApiError> {
        let path = self.config.state_path.clone();
        self.save_to(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ONE_HOUR};
    use crate::ledger::units;
    use crate::market_resolve::Side;

    fn state() -> (AppState, Arc<ManualClock>) {
        let clock = ManualClock::new(1_700_000_000);
        let config = AppConfig {
            cooldown_secs: 100,
            ..AppConfig::default()
        };
        (AppState::with_clock(config, clock.clone()).unwrap(), clock)
    }

    fn signed(state: &AppState, name: &str, nonce: u64, call: CallRequest) -> SignedCall {
        let account = state.accounts.get(name).unwrap();
        SignedCall::sign(account, nonce, state.clock.now(), call)
    }

    #[test]
    fn test_dev_accounts_funded() {
        let (state, _) = state();
        let alice = state.resolve_address("alice").unwrap();
        assert_eq!(state.ledger.balance(&alice), units(1_000));
    }

    #[test]
    fn test_submit_authenticates_sender() {
        let (mut state, _) = state();
        let call = signed(&state, "ALICE", 1, CallRequest::CreateMarket {
            question: "Will it rain?".into(),
            duration_secs: ONE_HOUR,
        });
        let (sender, outcome) = state.submit(call).unwrap();
        assert_eq!(sender, state.resolve_address("ALICE").unwrap());
        assert_eq!(outcome, CallOutcome::MarketCreated { market_id: MarketId(0) });
        assert_eq!(state.engine.market(MarketId(0)).unwrap().creator, sender);
        assert_eq!(state.last_nonce(&sender), 1);
    }

    #[test]
    fn test_replayed_nonce_rejected() {
        let (mut state, _) = state();
        let call = signed(&state, "BOB", 5, CallRequest::CreateMarket {
            question: "q".into(),
            duration_secs: 10,
        });
        state.submit(call.clone()).unwrap();
        let err = state.submit(call).unwrap_err();
        assert_eq!(err.code(), "StaleNonce");
    }

    #[test]
    fn test_expired_call_rejected() {
        let (mut state, clock) = state();
        let call = signed(&state, "BOB", 1, CallRequest::ClaimPayout { market_id: MarketId(0) });
        clock.advance(state.config.tx_expiry_secs + 1);
        assert_eq!(state.submit(call).unwrap_err().code(), "Expired");
    }

    #[test]
    fn test_dispatch_runs_full_flow() {
        let (mut state, clock) = state();
        let owner = state.resolve_address("OWNER").unwrap();
        let alice = state.resolve_address("ALICE").unwrap();

        state
            .dispatch(&owner, CallRequest::CreateMarket { question: "q".into(), duration_secs: ONE_HOUR })
            .unwrap();
        let id = MarketId(0);
        state.dispatch(&owner, CallRequest::AddLiquidity { market_id: id, amount: units(100) }).unwrap();
        state
            .dispatch(&alice, CallRequest::BuyShares { market_id: id, side: Side::Yes, amount: units(10) })
            .unwrap();

        clock.advance(ONE_HOUR);
        let tx_id = match state.dispatch(&owner, CallRequest::AssertQuestion { market_id: id }).unwrap() {
            CallOutcome::QuestionAsserted { tx_id, .. } => tx_id,
            other => panic!("unexpected outcome {:?}", other),
        };
        for signer in state.config.signers.clone() {
            state.dispatch(&signer, CallRequest::SignTransaction { tx_id }).unwrap();
        }
        clock.advance(100);
        state.dispatch(&alice, CallRequest::ExecuteTransaction { tx_id }).unwrap();
        assert_eq!(
            state.dispatch(&alice, CallRequest::ResolveMarket { market_id: id }).unwrap(),
            CallOutcome::MarketResolved { market_id: id, outcome: true }
        );
        let payout = state.dispatch(&alice, CallRequest::ClaimPayout { market_id: id }).unwrap();
        assert!(matches!(payout, CallOutcome::PayoutClaimed { amount, .. } if amount > 0));
    }

    #[test]
    fn test_faucet_disabled_at_zero() {
        let clock = ManualClock::new(0);
        let config = AppConfig {
            faucet_amount: 0,
            ..AppConfig::default()
        };
        let mut state = AppState::with_clock(config, clock).unwrap();
        let alice = state.resolve_address("ALICE").unwrap();
        assert_eq!(state.ledger.balance(&alice), 0);
        assert_eq!(state.faucet(&alice).unwrap_err().code(), "Disabled");
    }

    #[test]
    fn test_snapshot_written() {
        let (mut state, _) = state();
        let owner = state.resolve_address("OWNER").unwrap();
        state
            .dispatch(&owner, CallRequest::CreateMarket { question: "q".into(), duration_secs: 10 })
            .unwrap();

        let path = std::env::temp_dir().join(format!("quorum-market-{}", uuid::Uuid::new_v4())).join("state.json");
        state.save_to(&path).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["markets"].as_array().unwrap().len(), 1);
        assert!(!saved["events"].as_array().unwrap().is_empty());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
